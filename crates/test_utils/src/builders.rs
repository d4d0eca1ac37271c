//! Test data builders
//!
//! Builders with sensible defaults so tests only spell out the fields
//! they care about.

use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, PartyId, PolicyId};
use domain_claims::{ClaimRequest, ClaimType, EvidenceRef, RiskAnalysis};

/// Builder for intake requests
pub struct ClaimRequestBuilder {
    claimant_id: PartyId,
    policy_id: Option<PolicyId>,
    claim_type: ClaimType,
    requested_amount: Option<Money>,
    description: String,
    evidence_refs: Vec<EvidenceRef>,
    idempotency_key: Option<String>,
}

impl Default for ClaimRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimRequestBuilder {
    /// Creates a builder for a valid health claim
    pub fn new() -> Self {
        Self {
            claimant_id: PartyId::new(),
            policy_id: Some(PolicyId::new()),
            claim_type: ClaimType::Health,
            requested_amount: Some(Money::new(dec!(1250), Currency::USD)),
            description: "Emergency room visit".to_string(),
            evidence_refs: vec![EvidenceRef::new("QmEvidence1")],
            idempotency_key: None,
        }
    }

    pub fn with_claimant(mut self, claimant_id: PartyId) -> Self {
        self.claimant_id = claimant_id;
        self
    }

    pub fn with_policy_id(mut self, policy_id: Option<PolicyId>) -> Self {
        self.policy_id = policy_id;
        self
    }

    pub fn with_claim_type(mut self, claim_type: ClaimType) -> Self {
        self.claim_type = claim_type;
        self
    }

    pub fn with_requested_amount(mut self, amount: Option<Money>) -> Self {
        self.requested_amount = amount;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_evidence(mut self, refs: Vec<EvidenceRef>) -> Self {
        self.evidence_refs = refs;
        self
    }

    /// Clears evidence so automated analysis is skipped
    pub fn without_evidence(mut self) -> Self {
        self.evidence_refs = vec![];
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn build(self) -> ClaimRequest {
        ClaimRequest {
            claimant_id: self.claimant_id,
            policy_id: self.policy_id,
            claim_type: self.claim_type,
            requested_amount: self.requested_amount,
            description: self.description,
            evidence_refs: self.evidence_refs,
            idempotency_key: self.idempotency_key,
        }
    }
}

/// A low-fraud analysis suggesting the given payout
pub fn low_risk_analysis(suggested: Money) -> RiskAnalysis {
    RiskAnalysis {
        fraud_score: dec!(0.1),
        authenticity_score: dec!(0.95),
        confidence: dec!(0.9),
        suggested_amount: suggested,
    }
}

/// An analysis above the fraud threshold
pub fn fraudulent_analysis(currency: Currency) -> RiskAnalysis {
    RiskAnalysis {
        fraud_score: dec!(0.85),
        authenticity_score: dec!(0.3),
        confidence: dec!(0.8),
        suggested_amount: Money::zero(currency),
    }
}
