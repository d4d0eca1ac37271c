//! Core Kernel - Foundational types for the community claims platform
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers, including the cross-system correlation id
//! - Port error types shared by store and gateway adapters

pub mod identifiers;
pub mod money;
pub mod ports;

pub use identifiers::{ClaimId, CorrelationId, PartyId, PolicyId, ProposalId, VoteId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{DomainPort, PortError};
