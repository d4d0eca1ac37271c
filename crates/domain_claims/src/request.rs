//! Intake request validation

use serde::{Deserialize, Serialize};

use core_kernel::{Money, PartyId, PolicyId};

use crate::claim::{ClaimType, EvidenceRef};
use crate::error::ClaimError;

/// A request to open a new claim
///
/// Fields that the caller may omit are optional here so validation can
/// report exactly what is missing; `Claim::submit` only accepts a request
/// that passed validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub claimant_id: PartyId,
    pub policy_id: Option<PolicyId>,
    pub claim_type: ClaimType,
    pub requested_amount: Option<Money>,
    pub description: String,
    #[serde(default)]
    pub evidence_refs: Vec<EvidenceRef>,
    /// Client-supplied key used to reject duplicate submissions
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl ClaimRequest {
    /// Validates the request and returns the required fields
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::Validation` when the policy id is missing, the
    /// amount is missing or not positive, or the description is empty.
    pub fn validate(&self) -> Result<(PolicyId, Money), ClaimError> {
        let policy_id = self
            .policy_id
            .ok_or_else(|| ClaimError::Validation("policy id is required".to_string()))?;

        let amount = self
            .requested_amount
            .ok_or_else(|| ClaimError::Validation("requested amount is required".to_string()))?;
        if !amount.is_positive() {
            return Err(ClaimError::Validation(
                "requested amount must be positive".to_string(),
            ));
        }

        if self.description.trim().is_empty() {
            return Err(ClaimError::Validation(
                "description is required".to_string(),
            ));
        }

        Ok((policy_id, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn valid_request() -> ClaimRequest {
        ClaimRequest {
            claimant_id: PartyId::new(),
            policy_id: Some(PolicyId::new()),
            claim_type: ClaimType::Vehicle,
            requested_amount: Some(Money::new(dec!(4200), Currency::USD)),
            description: "Rear bumper damage".to_string(),
            evidence_refs: vec![],
            idempotency_key: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_missing_policy_id_rejected() {
        let mut request = valid_request();
        request.policy_id = None;
        assert!(matches!(
            request.validate(),
            Err(ClaimError::Validation(msg)) if msg.contains("policy")
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut request = valid_request();
        request.requested_amount = Some(Money::zero(Currency::USD));
        assert!(matches!(request.validate(), Err(ClaimError::Validation(_))));
    }

    #[test]
    fn test_blank_description_rejected() {
        let mut request = valid_request();
        request.description = "   ".to_string();
        assert!(matches!(request.validate(), Err(ClaimError::Validation(_))));
    }
}
