//! Governance domain
//!
//! Community resolution of claims: each claim under review gets a proposal
//! with a bounded voting window, members cast weighted votes, and the
//! outcome is decided by approval fraction against the proposal's
//! threshold. The `GovernanceEngine` keeps proposals in memory with
//! per-proposal locking so a vote and its tally update are atomic.

pub mod engine;
pub mod error;
pub mod proposal;
pub mod vote;

pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use proposal::{Proposal, ProposalOutcome, ProposalStatus};
pub use vote::{Tally, Vote, VoteChoice};
