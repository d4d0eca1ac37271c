//! Proposal aggregate

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CorrelationId, ProposalId};

use crate::error::GovernanceError;
use crate::vote::Tally;

/// Default approval threshold: a proposal passes when strictly more than
/// 60% of the voting power cast is in favor
pub const DEFAULT_APPROVAL_THRESHOLD: Decimal = dec!(0.6);

/// Proposal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Voting window open
    Active,
    /// Decided in favor, resolution not yet applied
    Passed,
    /// Decided against or closed without quorum
    Rejected,
    /// Passed and the claim resolution has been applied
    Executed,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Executed => "executed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of closing a proposal's voting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Passed,
    Rejected,
    /// Too few votes to decide; the proposal stays active and may be
    /// extended
    NoQuorum,
}

/// A community vote on the disposition of one claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    /// Correlation id of the claim under review
    pub subject: CorrelationId,
    /// Human-readable summary shown to voters
    pub description: String,
    /// Approval fraction required to pass (strictly greater than)
    pub threshold: Decimal,
    /// Minimum number of votes for the tally to be decisive
    pub minimum_votes: u64,
    pub voting_ends_at: DateTime<Utc>,
    /// How many times the window has been extended for lack of quorum
    pub extensions: u32,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Opens a proposal with a voting window ending at `voting_ends_at`
    pub fn open(
        subject: CorrelationId,
        description: impl Into<String>,
        threshold: Decimal,
        minimum_votes: u64,
        voting_ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProposalId::new_v7(),
            subject,
            description: description.into(),
            threshold,
            minimum_votes,
            voting_ends_at,
            extensions: 0,
            status: ProposalStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if votes are still being accepted at `now`
    pub fn is_voting_open(&self, now: DateTime<Utc>) -> bool {
        self.status == ProposalStatus::Active && now < self.voting_ends_at
    }

    /// Decides the outcome of the voting window
    ///
    /// Without quorum the proposal stays active so the window can be
    /// extended. An approval fraction exactly equal to the threshold does
    /// not pass.
    pub fn decide(&mut self, tally: &Tally) -> ProposalOutcome {
        if tally.total_votes < self.minimum_votes {
            return ProposalOutcome::NoQuorum;
        }
        self.updated_at = Utc::now();
        if tally.approval_fraction > self.threshold {
            self.status = ProposalStatus::Passed;
            ProposalOutcome::Passed
        } else {
            self.status = ProposalStatus::Rejected;
            ProposalOutcome::Rejected
        }
    }

    /// Extends the voting window
    pub fn extend(&mut self, by: Duration) -> Result<(), GovernanceError> {
        if self.status != ProposalStatus::Active {
            return Err(GovernanceError::ProposalNotActive(self.id.to_string()));
        }
        self.voting_ends_at += by;
        self.extensions += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records that the passed proposal's resolution has been applied
    pub fn mark_executed(&mut self) -> Result<(), GovernanceError> {
        if self.status != ProposalStatus::Passed {
            return Err(GovernanceError::ProposalNotActive(self.id.to_string()));
        }
        self.status = ProposalStatus::Executed;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::Tally;

    fn active_proposal() -> Proposal {
        Proposal::open(
            CorrelationId::new(),
            "Approve health claim for 1250 USD",
            DEFAULT_APPROVAL_THRESHOLD,
            3,
            Utc::now() + Duration::days(3),
        )
    }

    fn tally(votes_for: Decimal, votes_against: Decimal, total_votes: u64) -> Tally {
        let total_power = votes_for + votes_against;
        Tally {
            votes_for,
            votes_against,
            total_power,
            total_votes,
            approval_fraction: if total_power.is_zero() {
                Decimal::ZERO
            } else {
                votes_for / total_power
            },
        }
    }

    #[test]
    fn test_passes_above_threshold() {
        let mut proposal = active_proposal();
        let outcome = proposal.decide(&tally(dec!(1500), dec!(500), 4));
        assert_eq!(outcome, ProposalOutcome::Passed);
        assert_eq!(proposal.status, ProposalStatus::Passed);
    }

    #[test]
    fn test_marginally_above_threshold_passes() {
        let mut proposal = active_proposal();
        // 6000004 of 10000000 is 0.6000004, strictly above the threshold.
        let outcome = proposal.decide(&tally(dec!(6000004), dec!(3999996), 5));
        assert_eq!(outcome, ProposalOutcome::Passed);
    }

    #[test]
    fn test_exact_threshold_rejects() {
        let mut proposal = active_proposal();
        // 60 of 100 is exactly the threshold, not strictly above it.
        let outcome = proposal.decide(&tally(dec!(60), dec!(40), 5));
        assert_eq!(outcome, ProposalOutcome::Rejected);
    }

    #[test]
    fn test_no_quorum_keeps_proposal_active() {
        let mut proposal = active_proposal();
        let outcome = proposal.decide(&tally(dec!(100), dec!(0), 2));
        assert_eq!(outcome, ProposalOutcome::NoQuorum);
        assert_eq!(proposal.status, ProposalStatus::Active);
    }

    #[test]
    fn test_extend_moves_window_and_counts() {
        let mut proposal = active_proposal();
        let before = proposal.voting_ends_at;
        proposal.extend(Duration::days(1)).unwrap();
        assert_eq!(proposal.voting_ends_at, before + Duration::days(1));
        assert_eq!(proposal.extensions, 1);
    }

    #[test]
    fn test_decided_proposal_cannot_extend() {
        let mut proposal = active_proposal();
        proposal.decide(&tally(dec!(10), dec!(90), 5));
        assert!(proposal.extend(Duration::days(1)).is_err());
    }

    #[test]
    fn test_mark_executed_requires_passed() {
        let mut proposal = active_proposal();
        assert!(proposal.mark_executed().is_err());
        proposal.decide(&tally(dec!(90), dec!(10), 5));
        proposal.mark_executed().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
    }
}
