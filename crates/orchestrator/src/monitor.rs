//! Resolution monitors
//!
//! One background task per open claim polls the governance tally and
//! applies the outcome to the claim. Monitors never panic the process:
//! every failure is caught, logged with the correlation id, and the poll
//! rescheduled. The voting deadline is tracked on the tokio clock, seeded
//! from the proposal's remaining window.

use std::collections::HashMap;
use std::sync::Mutex;

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use core_kernel::{CorrelationId, ProposalId};
use domain_claims::{ClaimError, ClaimStatus};
use domain_governance::{GovernanceError, ProposalOutcome};

use crate::lifecycle::{ClaimOrchestrator, ResolutionDecision};

/// Live monitor tasks keyed by claim
///
/// Spawning a second monitor for the same claim replaces the first, and
/// `shutdown` aborts everything on the way down.
#[derive(Default)]
pub struct MonitorRegistry {
    tasks: Mutex<HashMap<CorrelationId, JoinHandle<()>>>,
}

impl MonitorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts a monitor for the claim's proposal
    pub fn spawn(
        &self,
        orchestrator: Arc<ClaimOrchestrator>,
        correlation_id: CorrelationId,
        proposal_id: ProposalId,
    ) {
        let monitor = ResolutionMonitor {
            orchestrator,
            correlation_id,
            proposal_id,
        };
        let handle = tokio::spawn(monitor.run());

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = tasks.insert(correlation_id, handle) {
            previous.abort();
        }
    }

    /// Number of monitors that have not finished
    pub fn active_count(&self) -> usize {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    /// Aborts every live monitor
    pub fn shutdown(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

/// Rebuilds monitors from the store after a restart
///
/// Scans for non-terminal claims that have a recorded proposal and spawns
/// a monitor for each. Returns the number of monitors resumed.
pub async fn resume_monitors(
    orchestrator: &Arc<ClaimOrchestrator>,
) -> Result<usize, ClaimError> {
    let open = orchestrator.store().list_open_with_proposal().await?;
    let mut resumed = 0;
    for claim in open {
        if let Some(proposal_id) = claim.proposal_id {
            orchestrator.monitors().spawn(
                Arc::clone(orchestrator),
                claim.correlation_id,
                proposal_id,
            );
            resumed += 1;
        }
    }
    tracing::info!(resumed, "resolution monitors resumed");
    Ok(resumed)
}

enum MonitorStep {
    Continue,
    Done,
}

struct ResolutionMonitor {
    orchestrator: Arc<ClaimOrchestrator>,
    correlation_id: CorrelationId,
    proposal_id: ProposalId,
}

impl ResolutionMonitor {
    async fn run(mut self) {
        let config = self.orchestrator.config().clone();
        tokio::time::sleep(config.monitor_initial_delay).await;

        // Voting deadline on the tokio clock, seeded on the first poll.
        let mut window_end: Option<Instant> = None;
        let mut delay = config.monitor_poll_interval;
        let mut consecutive_failures = 0u32;

        loop {
            match self.poll_once(&mut window_end).await {
                Ok(MonitorStep::Done) => break,
                Ok(MonitorStep::Continue) => {
                    consecutive_failures = 0;
                    delay = config.monitor_poll_interval;
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        correlation_id = %self.correlation_id,
                        error = %e,
                        "claim disappeared, stopping monitor"
                    );
                    break;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= config.monitor_max_transient_failures {
                        // Retries exhausted; degrade to a slow fixed
                        // interval instead of giving up on the claim.
                        tracing::error!(
                            correlation_id = %self.correlation_id,
                            failures = consecutive_failures,
                            error = %e,
                            "monitor retries exhausted, degrading poll interval"
                        );
                        delay = config.monitor_degraded_interval;
                    } else {
                        delay = (delay * 2).min(config.monitor_backoff_cap);
                        tracing::warn!(
                            correlation_id = %self.correlation_id,
                            failures = consecutive_failures,
                            retry_in = ?delay,
                            error = %e,
                            "monitor poll failed, backing off"
                        );
                    }
                }
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn poll_once(
        &mut self,
        window_end: &mut Option<Instant>,
    ) -> Result<MonitorStep, ClaimError> {
        let config = self.orchestrator.config().clone();
        let claim = self
            .orchestrator
            .store()
            .get_by_correlation(&self.correlation_id)
            .await?;
        if claim.is_terminal() {
            return Ok(MonitorStep::Done);
        }
        if claim.status == ClaimStatus::Approved {
            // Resolution already applied; settlement is retried through an
            // explicit action, not by the monitor.
            return Ok(MonitorStep::Done);
        }

        let governance = Arc::clone(self.orchestrator.governance());
        let (proposal, tally) = match governance.get(self.proposal_id).await {
            Ok(pair) => pair,
            Err(GovernanceError::NotFound(_)) => {
                // Proposal state did not survive a restart; open a fresh
                // voting window for the claim.
                let description = format!(
                    "Approve {} claim for {} (voting reopened)",
                    claim.claim_type, claim.requested_amount
                );
                let proposal = governance
                    .open_proposal(
                        self.correlation_id,
                        description,
                        config.approval_threshold,
                        config.minimum_votes,
                        Utc::now() + config.voting_window,
                    )
                    .await;
                let proposal_id = proposal.id;
                self.orchestrator
                    .update_with_retry(&self.correlation_id, move |c| {
                        c.proposal_id = Some(proposal_id);
                        Ok(())
                    })
                    .await?;
                self.proposal_id = proposal_id;
                *window_end = None;
                tracing::warn!(
                    correlation_id = %self.correlation_id,
                    proposal_id = %proposal_id,
                    "proposal missing after restart, voting reopened"
                );
                return Ok(MonitorStep::Continue);
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %self.correlation_id,
                    error = %e,
                    "governance lookup failed"
                );
                return Ok(MonitorStep::Continue);
            }
        };

        let deadline = *window_end.get_or_insert_with(|| {
            let remaining = (proposal.voting_ends_at - Utc::now())
                .to_std()
                .unwrap_or_default();
            Instant::now() + remaining
        });
        let window_closed = Instant::now() >= deadline;

        let quorum_met = tally.total_votes >= proposal.minimum_votes;
        if quorum_met {
            // Exact threshold equality stays undecided until the window
            // closes, where it rejects.
            if tally.approval_fraction == proposal.threshold && !window_closed {
                return Ok(MonitorStep::Continue);
            }
            return self.apply_outcome().await;
        }

        if window_closed {
            if proposal.extensions == 0 {
                governance
                    .extend_voting(self.proposal_id, config.window_extension)
                    .await
                    .map_err(|e| {
                        ClaimError::Validation(format!("voting extension failed: {e}"))
                    })?;
                *window_end = Some(
                    Instant::now()
                        + config.window_extension.to_std().unwrap_or_default(),
                );
                return Ok(MonitorStep::Continue);
            }

            self.orchestrator
                .resolve(
                    &self.correlation_id,
                    ResolutionDecision::Reject {
                        reason: "no quorum".to_string(),
                    },
                )
                .await?;
            return Ok(MonitorStep::Done);
        }

        Ok(MonitorStep::Continue)
    }

    /// Closes voting and applies the decided outcome to the claim
    async fn apply_outcome(&self) -> Result<MonitorStep, ClaimError> {
        let outcome = self
            .orchestrator
            .governance()
            .close_voting(self.proposal_id)
            .await
            .map_err(|e| ClaimError::Validation(format!("closing vote failed: {e}")))?;

        match outcome {
            ProposalOutcome::Passed => {
                self.orchestrator
                    .resolve(&self.correlation_id, ResolutionDecision::Approve)
                    .await?;
                Ok(MonitorStep::Done)
            }
            ProposalOutcome::Rejected => {
                self.orchestrator
                    .resolve(
                        &self.correlation_id,
                        ResolutionDecision::Reject {
                            reason: "community vote against".to_string(),
                        },
                    )
                    .await?;
                Ok(MonitorStep::Done)
            }
            ProposalOutcome::NoQuorum => Ok(MonitorStep::Continue),
        }
    }
}
