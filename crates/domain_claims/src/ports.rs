//! Port traits for the claims domain
//!
//! The orchestrator depends only on these traits. Internal adapters
//! (in-memory store here, PostgreSQL in `infra_db`) and external adapters
//! (HTTP risk scorer and ledger gateway in `infra_gateways`) implement them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CorrelationId, Currency, DomainPort, Money, PartyId, PortError};

use crate::claim::{
    Claim, ClaimStatus, ClaimType, EvidenceRef, LedgerCorrelation, PreparedRef, RiskAnalysis,
};
use crate::error::ClaimError;

/// Durable record of claims
///
/// Updates are optimistic compare-and-set on the claim's `version`: a write
/// against a stale version fails with `ClaimError::Conflict` and the caller
/// re-reads and re-applies. This is how a monitor-path resolution and an
/// intake-path update avoid racing into an inconsistent status.
#[async_trait]
pub trait ClaimStore: DomainPort {
    /// Persists a new claim. A previously used idempotency key fails with
    /// `ClaimError::DuplicateClaim` without creating a second row.
    async fn insert(&self, claim: Claim, idempotency_key: Option<&str>)
        -> Result<Claim, ClaimError>;

    /// Fetches a claim by store identifier
    async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError>;

    /// Fetches a claim by its correlation id
    async fn get_by_correlation(&self, correlation_id: &CorrelationId)
        -> Result<Claim, ClaimError>;

    /// Compare-and-set update keyed on `claim.version`; returns the stored
    /// claim with the version bumped
    async fn update(&self, claim: &Claim) -> Result<Claim, ClaimError>;

    /// Non-terminal claims that have a governance proposal recorded - the
    /// set of resolution monitors to resume after a restart
    async fn list_open_with_proposal(&self) -> Result<Vec<Claim>, ClaimError>;

    /// Aggregate claim counts and totals
    async fn statistics(&self) -> Result<ClaimStatistics, ClaimError>;
}

/// Thin client to the external fraud/claim-analysis service
///
/// Timeouts and errors are both treated by callers as "unknown", never as
/// a rejection of the claim.
#[async_trait]
pub trait RiskScorer: DomainPort {
    async fn analyze(&self, claim: &Claim) -> Result<RiskAnalysis, PortError>;
}

/// Observed state of a prepared ledger transaction
///
/// Only `Confirmed` makes a ledger effect durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LedgerState {
    Pending,
    Confirmed { reference: PreparedRef },
    Failed { reason: String },
}

/// Thin client that reads ledger state and prepares transaction payloads
///
/// Never signs or broadcasts - the returned references identify payloads
/// for an external signer. Prepare calls are state-mutating on the gateway
/// side and must fail fast; only `get_state` is an idempotent read.
#[async_trait]
pub trait LedgerGateway: DomainPort {
    async fn prepare_submission(
        &self,
        correlation_id: &CorrelationId,
        claim: &Claim,
    ) -> Result<PreparedRef, PortError>;

    async fn prepare_settlement(
        &self,
        correlation_id: &CorrelationId,
        amount: &Money,
        recipient: &PartyId,
    ) -> Result<PreparedRef, PortError>;

    async fn get_state(&self, reference: &PreparedRef) -> Result<LedgerState, PortError>;
}

/// Fire-and-forget notification of claim status transitions
///
/// The real dispatcher is an external collaborator; failures are never
/// surfaced to the claim lifecycle.
#[async_trait]
pub trait NotificationDispatcher: DomainPort {
    async fn claim_status_changed(&self, claim: &Claim, previous: ClaimStatus);
}

/// Default dispatcher that records transitions in the log
pub struct TracingNotifier;

#[async_trait]
impl NotificationDispatcher for TracingNotifier {
    async fn claim_status_changed(&self, claim: &Claim, previous: ClaimStatus) {
        tracing::info!(
            correlation_id = %claim.correlation_id,
            from = %previous,
            to = %claim.status,
            "claim status changed"
        );
    }
}

impl DomainPort for TracingNotifier {}

/// Where a read-path snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Served from the claim store
    Store,
    /// Placeholder served because the backing systems were unreachable
    Fallback,
}

/// Read-side view of a claim
///
/// The degraded-mode read policy returns a clearly-flagged fallback
/// snapshot when the claim store is unreachable, rather than failing the
/// read outright. Fallback data never masks write-path errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSnapshot {
    pub source: SnapshotSource,
    pub correlation_id: CorrelationId,
    pub status: ClaimStatus,
    pub claim_type: ClaimType,
    pub requested_amount: Money,
    pub approved_amount: Option<Money>,
    pub description: String,
    pub evidence_refs: Vec<EvidenceRef>,
    pub risk_analysis: Option<RiskAnalysis>,
    pub ledger: LedgerCorrelation,
    pub updated_at: DateTime<Utc>,
}

impl ClaimSnapshot {
    /// Snapshot of a stored claim
    pub fn from_claim(claim: &Claim) -> Self {
        Self {
            source: SnapshotSource::Store,
            correlation_id: claim.correlation_id,
            status: claim.status,
            claim_type: claim.claim_type,
            requested_amount: claim.requested_amount,
            approved_amount: claim.approved_amount,
            description: claim.description.clone(),
            evidence_refs: claim.evidence_refs.clone(),
            risk_analysis: claim.risk_analysis.clone(),
            ledger: claim.ledger.clone(),
            updated_at: claim.updated_at,
        }
    }

    /// Placeholder snapshot served while the claim store is unreachable
    pub fn fallback(correlation_id: CorrelationId) -> Self {
        Self {
            source: SnapshotSource::Fallback,
            correlation_id,
            status: ClaimStatus::UnderReview,
            claim_type: ClaimType::Health,
            requested_amount: Money::zero(Currency::USD),
            approved_amount: None,
            description: "claim record temporarily unavailable".to_string(),
            evidence_refs: vec![],
            risk_analysis: None,
            ledger: LedgerCorrelation::default(),
            updated_at: Utc::now(),
        }
    }
}

/// Aggregate claim counts and totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimStatistics {
    pub total_claims: u64,
    /// Submitted, analyzed, or under review - not yet resolved
    pub pending_claims: u64,
    pub approved_claims: u64,
    pub paid_claims: u64,
    pub rejected_claims: u64,
    pub total_paid_amount: Decimal,
    /// (approved + paid) / total, zero when there are no claims
    pub approval_rate: Decimal,
}

impl ClaimStatistics {
    pub fn empty() -> Self {
        Self {
            total_claims: 0,
            pending_claims: 0,
            approved_claims: 0,
            paid_claims: 0,
            rejected_claims: 0,
            total_paid_amount: Decimal::ZERO,
            approval_rate: Decimal::ZERO,
        }
    }
}
