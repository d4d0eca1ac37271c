//! Claims domain error types

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors from claims operations
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Bad input, rejected synchronously at intake
    #[error("Validation error: {0}")]
    Validation(String),

    /// A claim with the same idempotency key already exists
    #[error("Duplicate claim: idempotency key '{0}' already used")]
    DuplicateClaim(String),

    /// Attempted edge is not in the status state machine
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// The claim was not found
    #[error("Claim not found: {0}")]
    NotFound(String),

    /// A concurrent writer updated the claim first; re-read and re-apply
    #[error("Concurrent update conflict for claim {0}")]
    Conflict(String),

    /// Monetary invariant violation
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Store or gateway transport failure
    #[error(transparent)]
    Store(#[from] PortError),
}

impl ClaimError {
    /// Returns true if the underlying failure is transient (store or
    /// gateway unreachable) - the degraded-mode read path serves a tagged
    /// fallback snapshot for these instead of failing
    pub fn is_transient(&self) -> bool {
        matches!(self, ClaimError::Store(e) if e.is_transient())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClaimError::NotFound(_))
    }
}
