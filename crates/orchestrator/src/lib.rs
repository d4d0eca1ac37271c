//! Claim lifecycle orchestration
//!
//! Wires the claims domain, the governance engine, and the outbound
//! gateways into the full lifecycle: intake, background risk analysis and
//! ledger preparation, community voting, resolution, and settlement.
//! Per-claim resolution monitors poll the tally and survive restarts via
//! `resume_monitors`.

pub mod config;
pub mod lifecycle;
pub mod monitor;

pub use config::OrchestratorConfig;
pub use lifecycle::{ClaimOrchestrator, ResolutionDecision};
pub use monitor::{resume_monitors, MonitorRegistry};
