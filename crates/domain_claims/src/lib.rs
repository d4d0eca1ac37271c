//! Claims domain
//!
//! This crate owns the claim aggregate and its status state machine, the
//! intake request validation, and the port traits through which the
//! orchestrator reaches the claim store, the risk scorer, and the ledger
//! gateway. An in-memory versioned store implementation lives here as well;
//! the PostgreSQL adapter is in `infra_db`.

pub mod claim;
pub mod error;
pub mod ports;
pub mod request;
pub mod store;

pub use claim::{
    Claim, ClaimStatus, ClaimType, EvidenceRef, LedgerCorrelation, PreparedRef, RiskAnalysis,
};
pub use error::ClaimError;
pub use ports::{
    ClaimSnapshot, ClaimStatistics, ClaimStore, LedgerGateway, LedgerState,
    NotificationDispatcher, RiskScorer, SnapshotSource, TracingNotifier,
};
pub use request::ClaimRequest;
pub use store::InMemoryClaimStore;
