//! Claim lifecycle orchestrator
//!
//! Drives one logical claim across three independently-failing systems:
//! the claim store, the external risk scorer, and the ledger/governance
//! layer. Intake persists the claim synchronously; every later stage runs
//! in the background, is independently fallible, and is logged with the
//! claim's correlation id. The correlation id is the only join key.

use std::sync::Arc;

use chrono::Utc;

use core_kernel::{CorrelationId, PortError};
use domain_claims::{
    Claim, ClaimError, ClaimRequest, ClaimSnapshot, ClaimStatistics, ClaimStatus, ClaimStore,
    LedgerGateway, NotificationDispatcher, RiskScorer,
};
use domain_governance::GovernanceEngine;

use crate::config::OrchestratorConfig;
use crate::monitor::MonitorRegistry;

/// Attempts for a compare-and-set update loop before giving up
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Disposition applied to a claim by the monitor or an administrator
#[derive(Debug, Clone)]
pub enum ResolutionDecision {
    Approve,
    Reject { reason: String },
}

/// Orchestrates the claim lifecycle from intake to disposition
pub struct ClaimOrchestrator {
    store: Arc<dyn ClaimStore>,
    scorer: Arc<dyn RiskScorer>,
    ledger: Arc<dyn LedgerGateway>,
    governance: Arc<GovernanceEngine>,
    notifier: Arc<dyn NotificationDispatcher>,
    config: OrchestratorConfig,
    monitors: MonitorRegistry,
}

impl ClaimOrchestrator {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        scorer: Arc<dyn RiskScorer>,
        ledger: Arc<dyn LedgerGateway>,
        governance: Arc<GovernanceEngine>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            scorer,
            ledger,
            governance,
            notifier,
            config,
            monitors: MonitorRegistry::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn governance(&self) -> &Arc<GovernanceEngine> {
        &self.governance
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    pub(crate) fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    /// Validates and persists a new claim, then schedules the rest of the
    /// pipeline in the background
    ///
    /// The returned claim reflects only the synchronous insert (status
    /// `submitted`). A reused idempotency key fails with `DuplicateClaim`
    /// and creates nothing.
    pub async fn intake(self: Arc<Self>, request: ClaimRequest) -> Result<Claim, ClaimError> {
        let claim = Claim::submit(&request)?;
        let stored = self
            .store
            .insert(claim, request.idempotency_key.as_deref())
            .await?;

        tracing::info!(
            correlation_id = %stored.correlation_id,
            claim_type = %stored.claim_type,
            amount = %stored.requested_amount,
            "claim submitted"
        );

        let orchestrator = Arc::clone(&self);
        let pipeline_claim = stored.clone();
        tokio::spawn(async move {
            orchestrator.run_intake_pipeline(pipeline_claim).await;
        });

        Ok(stored)
    }

    /// Background stages after intake: ledger submission preparation,
    /// proposal creation, risk analysis, monitor scheduling. Each stage
    /// failure is logged and absorbed; none of them fails the claim.
    async fn run_intake_pipeline(self: Arc<Self>, claim: Claim) {
        let correlation_id = claim.correlation_id;

        match self.ledger.prepare_submission(&correlation_id, &claim).await {
            Ok(reference) => {
                let result = self
                    .update_with_retry(&correlation_id, |c| {
                        c.record_submission_ref(reference.clone());
                        Ok(())
                    })
                    .await;
                if let Err(e) = result {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "failed to record ledger submission ref"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "ledger submission preparation failed, continuing without ref"
                );
            }
        }

        let description = format!(
            "Approve {} claim for {} submitted at {}",
            claim.claim_type,
            claim.requested_amount,
            claim.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
        let proposal = self
            .governance
            .open_proposal(
                correlation_id,
                description,
                self.config.approval_threshold,
                self.config.minimum_votes,
                Utc::now() + self.config.voting_window,
            )
            .await;

        let recorded = self
            .update_with_retry(&correlation_id, |c| {
                c.proposal_id = Some(proposal.id);
                Ok(())
            })
            .await;
        let proposal_id = match recorded {
            Ok(_) => Some(proposal.id),
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "failed to record proposal id, claim continues without a proposal"
                );
                None
            }
        };

        if !claim.evidence_refs.is_empty() {
            self.run_risk_analysis(&claim).await;
        }

        if let Some(proposal_id) = proposal_id {
            self.monitors
                .spawn(Arc::clone(&self), correlation_id, proposal_id);
        }
    }

    /// Calls the risk scorer and applies the verdict
    ///
    /// Failures and timeouts map to `under_review`; a claim that entered
    /// analysis is never left at `submitted`.
    async fn run_risk_analysis(&self, claim: &Claim) {
        let correlation_id = claim.correlation_id;
        let result = match self.scorer.analyze(claim).await {
            Ok(analysis) => {
                let validated = analysis.fraud_score < self.config.fraud_threshold;
                tracing::info!(
                    correlation_id = %correlation_id,
                    fraud_score = %analysis.fraud_score,
                    validated,
                    "risk analysis complete"
                );
                self.update_with_retry(&correlation_id, move |c| {
                    c.attach_risk_analysis(analysis.clone(), validated)
                })
                .await
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "risk analysis failed, claim goes to manual review"
                );
                self.update_with_retry(&correlation_id, |c| {
                    if c.status == ClaimStatus::Submitted {
                        c.update_status(ClaimStatus::UnderReview)?;
                    }
                    Ok(())
                })
                .await
            }
        };

        if let Err(e) = result {
            tracing::warn!(
                correlation_id = %correlation_id,
                error = %e,
                "failed to persist risk analysis outcome"
            );
        }
    }

    /// Applies a resolution decision to the claim
    ///
    /// Approval caps the payout at the requested amount, using the risk
    /// analysis suggestion when one exists, and then requests a settlement
    /// payload. A settlement failure leaves the claim `approved`; it never
    /// regresses to `rejected`.
    pub async fn resolve(
        &self,
        correlation_id: &CorrelationId,
        decision: ResolutionDecision,
    ) -> Result<Claim, ClaimError> {
        match decision {
            ResolutionDecision::Approve => {
                let claim = self
                    .update_with_retry(correlation_id, |c| {
                        let suggested = c.risk_analysis.as_ref().map(|r| r.suggested_amount);
                        c.approve(suggested)
                    })
                    .await?;

                tracing::info!(
                    correlation_id = %correlation_id,
                    approved_amount = ?claim.approved_amount,
                    "claim approved"
                );

                if let Some(proposal_id) = claim.proposal_id {
                    if let Err(e) = self.governance.mark_executed(proposal_id).await {
                        tracing::debug!(
                            correlation_id = %correlation_id,
                            error = %e,
                            "proposal not marked executed"
                        );
                    }
                }

                self.settle(&claim).await
            }
            ResolutionDecision::Reject { reason } => {
                let claim = self
                    .update_with_retry(correlation_id, move |c| c.reject(reason.clone()))
                    .await?;
                tracing::info!(
                    correlation_id = %correlation_id,
                    reason = ?claim.resolution_reason,
                    "claim rejected"
                );
                Ok(claim)
            }
        }
    }

    /// Prepares the settlement payload for an approved claim and marks it
    /// paid on success
    async fn settle(&self, claim: &Claim) -> Result<Claim, ClaimError> {
        let amount = match claim.approved_amount {
            Some(amount) => amount,
            None => return Ok(claim.clone()),
        };

        match self
            .ledger
            .prepare_settlement(&claim.correlation_id, &amount, &claim.claimant_id)
            .await
        {
            Ok(reference) => {
                self.update_with_retry(&claim.correlation_id, move |c| {
                    c.mark_paid(reference.clone())
                })
                .await
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %claim.correlation_id,
                    error = %e,
                    "settlement preparation failed, claim stays approved"
                );
                Ok(claim.clone())
            }
        }
    }

    /// Retries settlement preparation for an approved claim
    ///
    /// # Errors
    ///
    /// `ClaimError::Validation` when the claim is not awaiting settlement;
    /// gateway failures surface as `ClaimError::Store`.
    pub async fn retry_settlement(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Claim, ClaimError> {
        let claim = self.store.get_by_correlation(correlation_id).await?;
        if claim.status != ClaimStatus::Approved {
            return Err(ClaimError::Validation(format!(
                "claim is {} and not awaiting settlement",
                claim.status
            )));
        }

        let amount = claim.approved_amount.ok_or_else(|| {
            ClaimError::Validation("approved claim has no approved amount".to_string())
        })?;

        let reference = self
            .ledger
            .prepare_settlement(correlation_id, &amount, &claim.claimant_id)
            .await
            .map_err(ClaimError::Store)?;

        self.update_with_retry(correlation_id, move |c| c.mark_paid(reference.clone()))
            .await
    }

    /// Degraded-mode read
    ///
    /// A transient store failure yields a clearly-flagged fallback snapshot
    /// instead of an error; not-found still fails. Write paths never use
    /// this.
    pub async fn get_claim(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<ClaimSnapshot, ClaimError> {
        match self.store.get_by_correlation(correlation_id).await {
            Ok(claim) => Ok(ClaimSnapshot::from_claim(&claim)),
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "claim store unreachable, serving fallback snapshot"
                );
                Ok(ClaimSnapshot::fallback(*correlation_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Aggregate claim statistics
    pub async fn statistics(&self) -> Result<ClaimStatistics, ClaimError> {
        self.store.statistics().await
    }

    /// Compare-and-set update loop
    ///
    /// Re-reads the claim and re-applies `apply` on every version
    /// conflict, so transition legality is always checked against the
    /// fresh row. Status changes are dispatched to the notifier.
    pub(crate) async fn update_with_retry<F>(
        &self,
        correlation_id: &CorrelationId,
        apply: F,
    ) -> Result<Claim, ClaimError>
    where
        F: Fn(&mut Claim) -> Result<(), ClaimError>,
    {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let mut claim = self.store.get_by_correlation(correlation_id).await?;
            let previous_status = claim.status;
            apply(&mut claim)?;

            match self.store.update(&claim).await {
                Ok(updated) => {
                    if updated.status != previous_status {
                        self.notifier
                            .claim_status_changed(&updated, previous_status)
                            .await;
                    }
                    return Ok(updated);
                }
                Err(ClaimError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ClaimError::Store(PortError::conflict(format!(
            "claim {correlation_id} kept changing concurrently"
        ))))
    }
}
