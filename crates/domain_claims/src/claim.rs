//! Claim aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimId, CorrelationId, Money, PartyId, PolicyId};

use crate::error::ClaimError;
use crate::request::ClaimRequest;

/// Claim status
///
/// The lifecycle is monotonic: a claim never returns to `Submitted`, and
/// `Paid`, `Rejected`, and `Disputed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Persisted by intake, not yet analyzed
    Submitted,
    /// Automated analysis scored the claim below the fraud threshold
    AiValidated,
    /// Automated analysis scored the claim at or above the fraud threshold
    AiRejected,
    /// Automated analysis was attempted but failed or is inconclusive
    UnderReview,
    /// Approved by governance resolution
    Approved,
    /// Rejected by governance resolution or quorum timeout
    Rejected,
    /// Settlement payload prepared and recorded
    Paid,
    /// Under administrative dispute
    Disputed,
}

impl ClaimStatus {
    /// Returns true if no further transition is possible (disputes aside,
    /// `Disputed` itself is terminal for the orchestrator)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Paid | ClaimStatus::Rejected | ClaimStatus::Disputed
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::AiValidated => "ai_validated",
            ClaimStatus::AiRejected => "ai_rejected",
            ClaimStatus::UnderReview => "under_review",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Paid => "paid",
            ClaimStatus::Disputed => "disputed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(ClaimStatus::Submitted),
            "ai_validated" => Ok(ClaimStatus::AiValidated),
            "ai_rejected" => Ok(ClaimStatus::AiRejected),
            "under_review" => Ok(ClaimStatus::UnderReview),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            "paid" => Ok(ClaimStatus::Paid),
            "disputed" => Ok(ClaimStatus::Disputed),
            other => Err(ClaimError::Validation(format!(
                "unknown claim status '{other}'"
            ))),
        }
    }
}

/// Type of insured loss the claim is filed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Health,
    Vehicle,
    Travel,
    Warranty,
    Pet,
    Agricultural,
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimType::Health => "health",
            ClaimType::Vehicle => "vehicle",
            ClaimType::Travel => "travel",
            ClaimType::Warranty => "warranty",
            ClaimType::Pet => "pet",
            ClaimType::Agricultural => "agricultural",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ClaimType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "health" => Ok(ClaimType::Health),
            "vehicle" => Ok(ClaimType::Vehicle),
            "travel" => Ok(ClaimType::Travel),
            "warranty" => Ok(ClaimType::Warranty),
            "pet" => Ok(ClaimType::Pet),
            "agricultural" => Ok(ClaimType::Agricultural),
            other => Err(ClaimError::Validation(format!(
                "unknown claim type '{other}'"
            ))),
        }
    }
}

/// Opaque content-addressed reference to an evidence document
///
/// Resolved to bytes by the document store, which is outside this core.
/// The orchestrator never interprets these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(String);

impl EvidenceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to a prepared (unsigned) ledger transaction payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreparedRef(String);

impl PreparedRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreparedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of the risk scorer's assessment, attached once the scorer
/// responds. Last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    /// Fraud likelihood in [0, 1]
    pub fraud_score: rust_decimal::Decimal,
    /// Evidence authenticity in [0, 1]
    pub authenticity_score: rust_decimal::Decimal,
    /// Scorer confidence in [0, 1]
    pub confidence: rust_decimal::Decimal,
    /// Payout the scorer suggests
    pub suggested_amount: Money,
}

/// Ledger-side references for this claim
///
/// Absence of a reference means "not yet observed on ledger", never
/// "failed" - prepare calls are advisory and retried by explicit action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerCorrelation {
    pub submission_ref: Option<PreparedRef>,
    pub settlement_ref: Option<PreparedRef>,
}

/// A claim moving through the lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Store-assigned identifier
    pub id: ClaimId,
    /// Caller-visible join key across claim store, ledger, and governance
    pub correlation_id: CorrelationId,
    /// Claimant
    pub claimant_id: PartyId,
    /// Policy the claim is filed against
    pub policy_id: PolicyId,
    /// Type of loss
    pub claim_type: ClaimType,
    /// Amount requested by the claimant
    pub requested_amount: Money,
    /// Amount approved by resolution; unset until resolved
    pub approved_amount: Option<Money>,
    /// Claimant's description of the loss
    pub description: String,
    /// Ordered evidence references
    pub evidence_refs: Vec<EvidenceRef>,
    /// Risk scorer snapshot
    pub risk_analysis: Option<RiskAnalysis>,
    /// Ledger references
    pub ledger: LedgerCorrelation,
    /// Governance proposal opened for this claim, if creation succeeded
    pub proposal_id: Option<core_kernel::ProposalId>,
    /// Why the claim reached its current disposition
    pub resolution_reason: Option<String>,
    /// Status
    pub status: ClaimStatus,
    /// Optimistic-lock token, bumped by the store on every update
    pub version: u64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a new submitted claim from a validated intake request
    ///
    /// The correlation id is generated here, before any external call is
    /// made - it is the sole join key across the backing systems.
    pub fn submit(request: &ClaimRequest) -> Result<Self, ClaimError> {
        let (policy_id, requested_amount) = request.validate()?;
        let now = Utc::now();

        Ok(Self {
            id: ClaimId::new_v7(),
            correlation_id: CorrelationId::new(),
            claimant_id: request.claimant_id,
            policy_id,
            claim_type: request.claim_type,
            requested_amount,
            approved_amount: None,
            description: request.description.trim().to_string(),
            evidence_refs: request.evidence_refs.clone(),
            risk_analysis: None,
            ledger: LedgerCorrelation::default(),
            proposal_id: None,
            resolution_reason: None,
            status: ClaimStatus::Submitted,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Updates the status, validating the transition
    pub fn update_status(&mut self, status: ClaimStatus) -> Result<(), ClaimError> {
        if !self.can_transition_to(status) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Attaches a risk analysis snapshot (last write wins) and advances the
    /// status when the claim is still awaiting analysis
    ///
    /// `validated` carries the fraud-threshold verdict; when the claim has
    /// already moved past `Submitted` only the snapshot is recorded.
    pub fn attach_risk_analysis(
        &mut self,
        analysis: RiskAnalysis,
        validated: bool,
    ) -> Result<(), ClaimError> {
        self.risk_analysis = Some(analysis);
        self.updated_at = Utc::now();

        if self.status == ClaimStatus::Submitted {
            let next = if validated {
                ClaimStatus::AiValidated
            } else {
                ClaimStatus::AiRejected
            };
            self.update_status(next)?;
        }
        Ok(())
    }

    /// Approves the claim with the given suggested payout
    ///
    /// The approved amount is capped at the requested amount. A claim that
    /// never entered risk analysis is stepped through `UnderReview` first so
    /// resolution never skips a state-machine edge.
    pub fn approve(&mut self, suggested: Option<Money>) -> Result<(), ClaimError> {
        let amount = match suggested {
            Some(s) => s.cap_at(&self.requested_amount)?,
            None => self.requested_amount,
        };

        if self.status == ClaimStatus::Submitted {
            self.update_status(ClaimStatus::UnderReview)?;
        }
        self.update_status(ClaimStatus::Approved)?;
        self.approved_amount = Some(amount);
        Ok(())
    }

    /// Rejects the claim with a recorded reason
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), ClaimError> {
        if self.status == ClaimStatus::Submitted {
            self.update_status(ClaimStatus::UnderReview)?;
        }
        self.update_status(ClaimStatus::Rejected)?;
        self.resolution_reason = Some(reason.into());
        Ok(())
    }

    /// Marks the claim paid, recording the prepared settlement payload
    pub fn mark_paid(&mut self, settlement_ref: PreparedRef) -> Result<(), ClaimError> {
        self.update_status(ClaimStatus::Paid)?;
        self.ledger.settlement_ref = Some(settlement_ref);
        Ok(())
    }

    /// Records the prepared ledger submission payload
    pub fn record_submission_ref(&mut self, submission_ref: PreparedRef) {
        self.ledger.submission_ref = Some(submission_ref);
        self.updated_at = Utc::now();
    }

    /// Returns true if the claim reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Checks if a transition is valid
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        // Any non-terminal state may be disputed administratively.
        if target == Disputed {
            return !self.status.is_terminal();
        }
        matches!(
            (self.status, target),
            (Submitted, AiValidated)
                | (Submitted, AiRejected)
                | (Submitted, UnderReview)
                | (AiValidated, Approved)
                | (AiValidated, Rejected)
                | (AiRejected, Approved)
                | (AiRejected, Rejected)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (Approved, Paid)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ClaimRequest;
    use rust_decimal_macros::dec;

    fn submitted_claim() -> Claim {
        let request = ClaimRequest {
            claimant_id: PartyId::new(),
            policy_id: Some(PolicyId::new()),
            claim_type: ClaimType::Health,
            requested_amount: Some(Money::new(dec!(1250), core_kernel::Currency::USD)),
            description: "Emergency room visit".to_string(),
            evidence_refs: vec![EvidenceRef::new("QmEvidence1")],
            idempotency_key: None,
        };
        Claim::submit(&request).unwrap()
    }

    #[test]
    fn test_submit_starts_at_submitted() {
        let claim = submitted_claim();
        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert_eq!(claim.version, 1);
        assert!(claim.approved_amount.is_none());
        assert!(claim.ledger.submission_ref.is_none());
    }

    #[test]
    fn test_no_transition_back_to_submitted() {
        let mut claim = submitted_claim();
        claim.update_status(ClaimStatus::UnderReview).unwrap();
        assert!(claim.update_status(ClaimStatus::Submitted).is_err());
    }

    #[test]
    fn test_approved_amount_capped_at_requested() {
        let mut claim = submitted_claim();
        claim.update_status(ClaimStatus::AiValidated).unwrap();

        let suggested = Money::new(dec!(99999), core_kernel::Currency::USD);
        claim.approve(Some(suggested)).unwrap();

        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.approved_amount, Some(claim.requested_amount));
    }

    #[test]
    fn test_approve_from_submitted_steps_through_under_review() {
        let mut claim = submitted_claim();
        claim.approve(None).unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
    }

    #[test]
    fn test_rejected_is_terminal() {
        let mut claim = submitted_claim();
        claim.update_status(ClaimStatus::UnderReview).unwrap();
        claim.reject("no quorum").unwrap();

        assert!(claim.is_terminal());
        assert_eq!(claim.resolution_reason.as_deref(), Some("no quorum"));
        assert!(claim.update_status(ClaimStatus::Approved).is_err());
        assert!(!claim.can_transition_to(ClaimStatus::Disputed));
    }

    #[test]
    fn test_paid_after_approval() {
        let mut claim = submitted_claim();
        claim.update_status(ClaimStatus::AiValidated).unwrap();
        claim.approve(None).unwrap();
        claim.mark_paid(PreparedRef::new("0xsettlement")).unwrap();

        assert_eq!(claim.status, ClaimStatus::Paid);
        assert!(claim.ledger.settlement_ref.is_some());
    }

    #[test]
    fn test_dispute_reachable_from_any_non_terminal_state() {
        let mut claim = submitted_claim();
        assert!(claim.can_transition_to(ClaimStatus::Disputed));
        claim.update_status(ClaimStatus::AiRejected).unwrap();
        assert!(claim.can_transition_to(ClaimStatus::Disputed));
        claim.update_status(ClaimStatus::Disputed).unwrap();
        assert!(claim.is_terminal());
    }

    #[test]
    fn test_risk_analysis_attach_advances_status() {
        let analysis = RiskAnalysis {
            fraud_score: dec!(0.2),
            authenticity_score: dec!(0.9),
            confidence: dec!(0.85),
            suggested_amount: Money::new(dec!(1000), core_kernel::Currency::USD),
        };

        let mut validated = submitted_claim();
        validated.attach_risk_analysis(analysis.clone(), true).unwrap();
        assert_eq!(validated.status, ClaimStatus::AiValidated);

        let mut rejected = submitted_claim();
        rejected.attach_risk_analysis(analysis.clone(), false).unwrap();
        assert_eq!(rejected.status, ClaimStatus::AiRejected);

        // Past Submitted, only the snapshot is recorded.
        let mut resolved = submitted_claim();
        resolved.update_status(ClaimStatus::UnderReview).unwrap();
        resolved.approve(None).unwrap();
        resolved.attach_risk_analysis(analysis, false).unwrap();
        assert_eq!(resolved.status, ClaimStatus::Approved);
        assert!(resolved.risk_analysis.is_some());
    }
}
