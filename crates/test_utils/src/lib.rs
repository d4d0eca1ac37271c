//! Test utilities
//!
//! Shared builders and mock adapters for the claim lifecycle test suite.
//!
//! # Modules
//!
//! - `builders`: Builder patterns for test data construction
//! - `mocks`: Scriptable in-memory implementations of the outbound ports

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
