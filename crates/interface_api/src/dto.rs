//! Request and response DTOs
//!
//! Identifiers cross the wire as plain UUIDs on the way in and as
//! prefixed display strings (`COR-...`, `PRP-...`) on the way out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, Money, PartyId, PolicyId};
use domain_claims::{
    ClaimRequest, ClaimSnapshot, ClaimStatus, ClaimType, EvidenceRef, LedgerCorrelation,
    RiskAnalysis, SnapshotSource,
};
use domain_governance::{Proposal, ProposalOutcome, ProposalStatus, Tally, VoteChoice};

use crate::error::ApiError;

fn default_currency() -> String {
    "USD".to_string()
}

/// Request body for submitting a new claim
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitClaimRequest {
    pub claimant_id: Uuid,
    pub policy_id: Option<Uuid>,
    pub claim_type: ClaimType,
    pub requested_amount: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(length(min = 1, max = 2000, message = "description must be 1-2000 characters"))]
    pub description: String,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "idempotency key must be 1-128 characters"))]
    pub idempotency_key: Option<String>,
}

impl SubmitClaimRequest {
    /// Converts the wire request into a domain intake request
    pub fn into_domain(self) -> Result<ClaimRequest, ApiError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e: core_kernel::MoneyError| ApiError::Validation(e.to_string()))?;

        Ok(ClaimRequest {
            claimant_id: PartyId::from_uuid(self.claimant_id),
            policy_id: self.policy_id.map(PolicyId::from_uuid),
            claim_type: self.claim_type,
            requested_amount: self.requested_amount.map(|a| Money::new(a, currency)),
            description: self.description,
            evidence_refs: self.evidence_refs.into_iter().map(EvidenceRef::new).collect(),
            idempotency_key: self.idempotency_key,
        })
    }
}

/// Claim as served over the API
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub correlation_id: String,
    pub status: ClaimStatus,
    pub claim_type: ClaimType,
    pub source: SnapshotSource,
    pub requested_amount: Money,
    pub approved_amount: Option<Money>,
    pub description: String,
    pub evidence_refs: Vec<EvidenceRef>,
    pub risk_analysis: Option<RiskAnalysis>,
    pub ledger: LedgerCorrelation,
    pub updated_at: DateTime<Utc>,
}

impl From<ClaimSnapshot> for ClaimResponse {
    fn from(snapshot: ClaimSnapshot) -> Self {
        Self {
            correlation_id: snapshot.correlation_id.to_string(),
            status: snapshot.status,
            claim_type: snapshot.claim_type,
            source: snapshot.source,
            requested_amount: snapshot.requested_amount,
            approved_amount: snapshot.approved_amount,
            description: snapshot.description,
            evidence_refs: snapshot.evidence_refs,
            risk_analysis: snapshot.risk_analysis,
            ledger: snapshot.ledger,
            updated_at: snapshot.updated_at,
        }
    }
}

/// Request body for casting a vote
#[derive(Debug, Deserialize, Validate)]
pub struct CastVoteRequest {
    pub voter_id: Uuid,
    pub choice: VoteChoice,
    pub voting_power: Decimal,
    #[serde(default)]
    #[validate(length(max = 1000, message = "reasoning must be at most 1000 characters"))]
    pub reasoning: Option<String>,
}

/// The domain keeps the approval fraction unrounded for threshold
/// comparisons; responses carry a six-place rendering.
fn display_tally(mut tally: Tally) -> Tally {
    tally.approval_fraction = tally.approval_fraction.round_dp(6);
    tally
}

/// Tally returned after a vote is cast
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub proposal_id: String,
    pub tally: Tally,
}

impl VoteResponse {
    pub fn new(proposal_id: impl ToString, tally: Tally) -> Self {
        Self {
            proposal_id: proposal_id.to_string(),
            tally: display_tally(tally),
        }
    }
}

/// Proposal with its current tally
#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub proposal_id: String,
    pub claim_correlation_id: String,
    pub description: String,
    pub status: ProposalStatus,
    pub threshold: Decimal,
    pub minimum_votes: u64,
    pub voting_ends_at: DateTime<Utc>,
    pub extensions: u32,
    pub tally: Tally,
    pub created_at: DateTime<Utc>,
}

impl ProposalResponse {
    pub fn from_parts(proposal: Proposal, tally: Tally) -> Self {
        Self {
            proposal_id: proposal.id.to_string(),
            claim_correlation_id: proposal.subject.to_string(),
            description: proposal.description,
            status: proposal.status,
            threshold: proposal.threshold,
            minimum_votes: proposal.minimum_votes,
            voting_ends_at: proposal.voting_ends_at,
            extensions: proposal.extensions,
            tally: display_tally(tally),
            created_at: proposal.created_at,
        }
    }
}

/// Result of executing a proposal after its voting window closed
#[derive(Debug, Serialize)]
pub struct ExecuteProposalResponse {
    pub outcome: ProposalOutcome,
    pub proposal: ProposalResponse,
}
