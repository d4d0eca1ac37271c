//! External service adapters
//!
//! HTTP implementations of the claims domain's outbound ports: the risk
//! analysis service and the ledger gateway. Each adapter wraps a
//! `reqwest::Client` with a base URL, bearer authentication, and a
//! per-request timeout, and maps transport failures onto `PortError` so
//! the orchestrator's transient/permanent classification holds across
//! adapters.
//!
//! Retry policy lives with the caller-visible semantics of each call:
//! ledger state reads are idempotent and retried with bounded backoff;
//! prepare calls mutate gateway state and fail fast.

pub mod ledger;
mod retry;
pub mod risk;

pub use ledger::{HttpLedgerGateway, LedgerGatewayConfig};
pub use risk::{HttpRiskScorer, RiskScorerConfig};
