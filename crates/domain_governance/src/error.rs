//! Governance error types

use thiserror::Error;

/// Errors from governance operations
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The voting window has closed or the proposal was already decided
    #[error("Voting is closed for proposal {0}")]
    VotingClosed(String),

    /// Each member votes at most once per proposal
    #[error("Voter {voter} already voted on proposal {proposal}")]
    DuplicateVote { proposal: String, voter: String },

    /// The operation requires an active proposal
    #[error("Proposal {0} is not active")]
    ProposalNotActive(String),

    /// Voting power must be positive
    #[error("Invalid voting power: {0}")]
    InvalidPower(String),

    /// The proposal was not found
    #[error("Proposal not found: {0}")]
    NotFound(String),
}

impl GovernanceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GovernanceError::NotFound(_))
    }
}
