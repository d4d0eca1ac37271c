//! Votes and tallies

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{PartyId, VoteId};

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    /// Counts toward quorum and total power, not toward approval
    Abstain,
}

/// A single weighted vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter: PartyId,
    pub choice: VoteChoice,
    /// Voting power, proportional to the member's stake
    pub power: Decimal,
    /// Free-text justification; recorded, never interpreted
    pub reasoning: Option<String>,
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn cast(
        voter: PartyId,
        choice: VoteChoice,
        power: Decimal,
        reasoning: Option<String>,
    ) -> Self {
        Self {
            id: VoteId::new(),
            voter,
            choice,
            power,
            reasoning,
            cast_at: Utc::now(),
        }
    }
}

/// Running tally of a proposal's votes
///
/// `approval_fraction` is votes-for power over decisive power
/// (for + against), kept unrounded so threshold comparisons see the
/// exact quotient. Abstentions count toward `total_votes` (quorum) and
/// `total_power` but never move the fraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub votes_for: Decimal,
    pub votes_against: Decimal,
    pub total_power: Decimal,
    pub total_votes: u64,
    pub approval_fraction: Decimal,
}

impl Tally {
    /// Folds one vote into the tally
    pub fn apply(&mut self, vote: &Vote) {
        match vote.choice {
            VoteChoice::For => self.votes_for += vote.power,
            VoteChoice::Against => self.votes_against += vote.power,
            VoteChoice::Abstain => {}
        }
        self.total_power += vote.power;
        self.total_votes += 1;
        let decisive = self.votes_for + self.votes_against;
        self.approval_fraction = if decisive.is_zero() {
            Decimal::ZERO
        } else {
            self.votes_for / decisive
        };
    }
}
