//! In-memory claim store
//!
//! Backs the test suites and local development. Implements the same
//! versioned compare-and-set contract as the PostgreSQL adapter in
//! `infra_db`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use core_kernel::{ClaimId, CorrelationId, DomainPort};

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;
use crate::ports::{ClaimStatistics, ClaimStore};

#[derive(Default)]
struct Inner {
    claims: HashMap<ClaimId, Claim>,
    by_correlation: HashMap<CorrelationId, ClaimId>,
    idempotency_keys: HashMap<String, ClaimId>,
}

/// Map-backed claim store guarded by a single `RwLock`
#[derive(Default)]
pub struct InMemoryClaimStore {
    inner: RwLock<Inner>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for InMemoryClaimStore {}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn insert(
        &self,
        claim: Claim,
        idempotency_key: Option<&str>,
    ) -> Result<Claim, ClaimError> {
        let mut inner = self.inner.write().await;

        if let Some(key) = idempotency_key {
            if inner.idempotency_keys.contains_key(key) {
                return Err(ClaimError::DuplicateClaim(key.to_string()));
            }
            inner.idempotency_keys.insert(key.to_string(), claim.id);
        }

        inner.by_correlation.insert(claim.correlation_id, claim.id);
        inner.claims.insert(claim.id, claim.clone());
        Ok(claim)
    }

    async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        let inner = self.inner.read().await;
        inner
            .claims
            .get(&id)
            .cloned()
            .ok_or_else(|| ClaimError::NotFound(id.to_string()))
    }

    async fn get_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Claim, ClaimError> {
        let inner = self.inner.read().await;
        let id = inner
            .by_correlation
            .get(correlation_id)
            .ok_or_else(|| ClaimError::NotFound(correlation_id.to_string()))?;
        inner
            .claims
            .get(id)
            .cloned()
            .ok_or_else(|| ClaimError::NotFound(correlation_id.to_string()))
    }

    async fn update(&self, claim: &Claim) -> Result<Claim, ClaimError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .claims
            .get_mut(&claim.id)
            .ok_or_else(|| ClaimError::NotFound(claim.id.to_string()))?;

        if stored.version != claim.version {
            return Err(ClaimError::Conflict(claim.id.to_string()));
        }

        let mut updated = claim.clone();
        updated.version += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_open_with_proposal(&self) -> Result<Vec<Claim>, ClaimError> {
        let inner = self.inner.read().await;
        Ok(inner
            .claims
            .values()
            .filter(|c| !c.is_terminal() && c.proposal_id.is_some())
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> Result<ClaimStatistics, ClaimError> {
        let inner = self.inner.read().await;
        let mut stats = ClaimStatistics::empty();

        for claim in inner.claims.values() {
            stats.total_claims += 1;
            match claim.status {
                ClaimStatus::Submitted
                | ClaimStatus::AiValidated
                | ClaimStatus::AiRejected
                | ClaimStatus::UnderReview => stats.pending_claims += 1,
                ClaimStatus::Approved => stats.approved_claims += 1,
                ClaimStatus::Paid => {
                    stats.paid_claims += 1;
                    if let Some(amount) = claim.approved_amount {
                        stats.total_paid_amount += amount.amount();
                    }
                }
                ClaimStatus::Rejected => stats.rejected_claims += 1,
                ClaimStatus::Disputed => {}
            }
        }

        if stats.total_claims > 0 {
            let resolved = Decimal::from(stats.approved_claims + stats.paid_claims);
            stats.approval_rate = (resolved / Decimal::from(stats.total_claims)).round_dp(4);
        }
        Ok(stats)
    }
}
