//! Governance voting handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use core_kernel::{PartyId, ProposalId};
use domain_claims::ClaimError;
use domain_governance::ProposalOutcome;
use orchestrator::ResolutionDecision;

use crate::dto::{CastVoteRequest, ExecuteProposalResponse, ProposalResponse, VoteResponse};
use crate::error::ApiError;
use crate::AppState;

fn parse_proposal_id(raw: &str) -> Result<ProposalId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid proposal id '{raw}'")))
}

/// POST /api/v1/proposals/:proposal_id/votes
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<VoteResponse>), ApiError> {
    payload.validate()?;
    let proposal_id = parse_proposal_id(&proposal_id)?;

    let tally = state
        .orchestrator
        .governance()
        .cast_vote(
            proposal_id,
            PartyId::from_uuid(payload.voter_id),
            payload.choice,
            payload.voting_power,
            payload.reasoning,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(VoteResponse::new(proposal_id, tally))))
}

/// GET /api/v1/proposals/:proposal_id
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let proposal_id = parse_proposal_id(&proposal_id)?;
    let (proposal, tally) = state.orchestrator.governance().get(proposal_id).await?;
    Ok(Json(ProposalResponse::from_parts(proposal, tally)))
}

/// POST /api/v1/proposals/:proposal_id/execute
///
/// Decides the proposal from the tally at the time of the call and applies
/// the outcome to the claim. Without quorum the proposal stays active and
/// no claim transition happens. Idempotent on already-decided proposals.
/// The resolution monitor normally does this on its own; the endpoint
/// exists for manual intervention.
pub async fn execute_proposal(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ExecuteProposalResponse>, ApiError> {
    let proposal_id = parse_proposal_id(&proposal_id)?;
    let governance = state.orchestrator.governance();

    let outcome = governance.execute_proposal(proposal_id).await?;
    let (proposal, tally) = governance.get(proposal_id).await?;
    let subject = proposal.subject;

    let decision = match outcome {
        ProposalOutcome::Passed => Some(ResolutionDecision::Approve),
        ProposalOutcome::Rejected => Some(ResolutionDecision::Reject {
            reason: "community vote against".to_string(),
        }),
        ProposalOutcome::NoQuorum => None,
    };

    if let Some(decision) = decision {
        match state.orchestrator.resolve(&subject, decision).await {
            Ok(_) => {}
            // The monitor already resolved the claim
            Err(ClaimError::InvalidStatusTransition { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let (proposal, tally) = match governance.get(proposal_id).await {
        Ok(pair) => pair,
        Err(_) => (proposal, tally),
    };
    Ok(Json(ExecuteProposalResponse {
        outcome,
        proposal: ProposalResponse::from_parts(proposal, tally),
    }))
}
