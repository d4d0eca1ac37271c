//! HTTP API for the claim lifecycle orchestrator
//!
//! Exposes claim intake, claim reads, settlement retry, and governance
//! voting under `/api/v1`, plus health probes. All domain work is
//! delegated to the orchestrator.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use orchestrator::ClaimOrchestrator;

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;

pub use config::ApiConfig;
pub use error::{ApiError, ErrorResponse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ClaimOrchestrator>,
}

/// Creates the application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/claims", post(handlers::claims::submit_claim))
        .route("/claims/stats", get(handlers::claims::claim_statistics))
        .route("/claims/:correlation_id", get(handlers::claims::get_claim))
        .route(
            "/claims/:correlation_id/settlement",
            post(handlers::claims::retry_settlement),
        )
        .route(
            "/proposals/:proposal_id",
            get(handlers::governance::get_proposal),
        )
        .route(
            "/proposals/:proposal_id/votes",
            post(handlers::governance::cast_vote),
        )
        .route(
            "/proposals/:proposal_id/execute",
            post(handlers::governance::execute_proposal),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
