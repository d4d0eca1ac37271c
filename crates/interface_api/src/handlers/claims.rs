//! Claim intake and read handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use core_kernel::CorrelationId;
use domain_claims::{ClaimSnapshot, ClaimStatistics};

use crate::dto::{ClaimResponse, SubmitClaimRequest};
use crate::error::ApiError;
use crate::AppState;

fn parse_correlation_id(raw: &str) -> Result<CorrelationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid correlation id '{raw}'")))
}

/// POST /api/v1/claims
///
/// Persists the claim and returns it in `submitted` status; analysis,
/// ledger preparation, and voting happen in the background.
pub async fn submit_claim(
    State(state): State<AppState>,
    Json(payload): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    payload.validate()?;
    let request = payload.into_domain()?;

    let claim = state.orchestrator.clone().intake(request).await?;
    let response = ClaimResponse::from(ClaimSnapshot::from_claim(&claim));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/claims/:correlation_id
///
/// Serves a fallback snapshot flagged `source: fallback` while the claim
/// store is unreachable.
pub async fn get_claim(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let correlation_id = parse_correlation_id(&correlation_id)?;
    let snapshot = state.orchestrator.get_claim(&correlation_id).await?;
    Ok(Json(ClaimResponse::from(snapshot)))
}

/// POST /api/v1/claims/:correlation_id/settlement
///
/// Retries settlement preparation for a claim stuck in `approved`.
pub async fn retry_settlement(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let correlation_id = parse_correlation_id(&correlation_id)?;
    let claim = state.orchestrator.retry_settlement(&correlation_id).await?;
    Ok(Json(ClaimResponse::from(ClaimSnapshot::from_claim(&claim))))
}

/// GET /api/v1/claims/stats
pub async fn claim_statistics(
    State(state): State<AppState>,
) -> Result<Json<ClaimStatistics>, ApiError> {
    let stats = state.orchestrator.statistics().await?;
    Ok(Json(stats))
}
