//! Governance engine
//!
//! Holds active proposals and their vote ledgers. The outer map is read-
//! locked for lookups; each proposal carries its own mutex so casting a
//! vote and folding it into the tally happen atomically without blocking
//! votes on other proposals.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use core_kernel::{CorrelationId, PartyId, ProposalId};

use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalOutcome};
use crate::vote::{Tally, Vote, VoteChoice};

struct ProposalEntry {
    proposal: Proposal,
    votes: HashMap<PartyId, Vote>,
    tally: Tally,
}

/// In-memory proposal registry and vote ledger
#[derive(Default)]
pub struct GovernanceEngine {
    proposals: RwLock<HashMap<ProposalId, Arc<Mutex<ProposalEntry>>>>,
}

impl GovernanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: ProposalId) -> Result<Arc<Mutex<ProposalEntry>>, GovernanceError> {
        let proposals = self.proposals.read().await;
        proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| GovernanceError::NotFound(id.to_string()))
    }

    /// Opens an active proposal for the given claim
    pub async fn open_proposal(
        &self,
        subject: CorrelationId,
        description: impl Into<String>,
        threshold: Decimal,
        minimum_votes: u64,
        voting_ends_at: DateTime<Utc>,
    ) -> Proposal {
        let proposal = Proposal::open(subject, description, threshold, minimum_votes, voting_ends_at);
        let entry = ProposalEntry {
            proposal: proposal.clone(),
            votes: HashMap::new(),
            tally: Tally::default(),
        };
        let mut proposals = self.proposals.write().await;
        proposals.insert(proposal.id, Arc::new(Mutex::new(entry)));
        tracing::info!(proposal_id = %proposal.id, subject = %proposal.subject, "proposal opened");
        proposal
    }

    /// Casts a vote and returns the updated tally
    ///
    /// # Errors
    ///
    /// `VotingClosed` when the window has ended or the proposal was already
    /// decided, `DuplicateVote` when the member voted before,
    /// `InvalidPower` for non-positive power.
    pub async fn cast_vote(
        &self,
        id: ProposalId,
        voter: PartyId,
        choice: VoteChoice,
        power: Decimal,
        reasoning: Option<String>,
    ) -> Result<Tally, GovernanceError> {
        if power <= Decimal::ZERO {
            return Err(GovernanceError::InvalidPower(power.to_string()));
        }

        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;

        if !entry.proposal.is_voting_open(Utc::now()) {
            return Err(GovernanceError::VotingClosed(id.to_string()));
        }
        if entry.votes.contains_key(&voter) {
            return Err(GovernanceError::DuplicateVote {
                proposal: id.to_string(),
                voter: voter.to_string(),
            });
        }

        let vote = Vote::cast(voter, choice, power, reasoning);
        entry.tally.apply(&vote);
        entry.votes.insert(voter, vote);

        tracing::debug!(
            proposal_id = %id,
            total_votes = entry.tally.total_votes,
            approval = %entry.tally.approval_fraction,
            "vote cast"
        );
        Ok(entry.tally.clone())
    }

    /// Current tally
    pub async fn tally(&self, id: ProposalId) -> Result<Tally, GovernanceError> {
        let entry = self.entry(id).await?;
        let entry = entry.lock().await;
        Ok(entry.tally.clone())
    }

    /// Proposal state together with its tally
    pub async fn get(&self, id: ProposalId) -> Result<(Proposal, Tally), GovernanceError> {
        let entry = self.entry(id).await?;
        let entry = entry.lock().await;
        Ok((entry.proposal.clone(), entry.tally.clone()))
    }

    /// Decides the proposal from its tally, regardless of the clock
    ///
    /// Called by the resolution monitor, whose schedule is the authority
    /// on when the window ends. Idempotent for decided proposals.
    pub async fn close_voting(&self, id: ProposalId) -> Result<ProposalOutcome, GovernanceError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;

        match entry.proposal.status {
            crate::proposal::ProposalStatus::Passed
            | crate::proposal::ProposalStatus::Executed => return Ok(ProposalOutcome::Passed),
            crate::proposal::ProposalStatus::Rejected => return Ok(ProposalOutcome::Rejected),
            crate::proposal::ProposalStatus::Active => {}
        }

        let tally = entry.tally.clone();
        let outcome = entry.proposal.decide(&tally);
        tracing::info!(proposal_id = %id, outcome = ?outcome, "voting closed");
        Ok(outcome)
    }

    /// Decides the proposal from the tally at the time of the call
    ///
    /// Idempotent: re-invoking on a decided proposal returns the existing
    /// outcome without further mutation. Without quorum the proposal stays
    /// active.
    pub async fn execute_proposal(
        &self,
        id: ProposalId,
    ) -> Result<ProposalOutcome, GovernanceError> {
        self.close_voting(id).await
    }

    /// Extends the voting window of an undecided proposal
    pub async fn extend_voting(
        &self,
        id: ProposalId,
        by: Duration,
    ) -> Result<Proposal, GovernanceError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        entry.proposal.extend(by)?;
        tracing::info!(
            proposal_id = %id,
            extensions = entry.proposal.extensions,
            voting_ends_at = %entry.proposal.voting_ends_at,
            "voting window extended"
        );
        Ok(entry.proposal.clone())
    }

    /// Records that a passed proposal's resolution has been applied
    pub async fn mark_executed(&self, id: ProposalId) -> Result<(), GovernanceError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        entry.proposal.mark_executed()
    }
}
