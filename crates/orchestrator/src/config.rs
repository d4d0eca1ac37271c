//! Orchestrator configuration

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Tunables for the intake pipeline and the resolution monitors
///
/// Defaults match the deployed policy: claims scoring at or above the
/// fraud threshold are flagged, proposals need strictly more than 60%
/// approval, and a voting window runs three days with at most one
/// one-day extension when quorum is missed.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Fraud score at or above which analysis flags the claim
    pub fraud_threshold: Decimal,
    /// Approval fraction a proposal must strictly exceed
    pub approval_threshold: Decimal,
    /// Minimum number of votes for a decisive tally
    pub minimum_votes: u64,
    /// Length of a proposal's voting window
    pub voting_window: chrono::Duration,
    /// Window extension granted on the first quorum miss
    pub window_extension: chrono::Duration,
    /// Delay before a monitor's first poll
    pub monitor_initial_delay: Duration,
    /// Interval between monitor polls
    pub monitor_poll_interval: Duration,
    /// Ceiling for the transient-failure backoff
    pub monitor_backoff_cap: Duration,
    /// Consecutive transient failures before the monitor degrades
    pub monitor_max_transient_failures: u32,
    /// Poll interval once degraded
    pub monitor_degraded_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fraud_threshold: dec!(0.7),
            approval_threshold: dec!(0.6),
            minimum_votes: 3,
            voting_window: chrono::Duration::days(3),
            window_extension: chrono::Duration::days(1),
            monitor_initial_delay: Duration::from_secs(10),
            monitor_poll_interval: Duration::from_secs(30),
            monitor_backoff_cap: Duration::from_secs(5 * 60),
            monitor_max_transient_failures: 5,
            monitor_degraded_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_minimum_votes(mut self, minimum_votes: u64) -> Self {
        self.minimum_votes = minimum_votes;
        self
    }

    pub fn with_voting_window(mut self, window: chrono::Duration) -> Self {
        self.voting_window = window;
        self
    }

    pub fn with_fraud_threshold(mut self, threshold: Decimal) -> Self {
        self.fraud_threshold = threshold;
        self
    }
}
