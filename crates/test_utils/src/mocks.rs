//! Mock adapters for the outbound ports
//!
//! Each mock records its calls and can be scripted to fail, so lifecycle
//! tests can drive the orchestrator through gateway outages without any
//! network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use core_kernel::{CorrelationId, DomainPort, Money, PartyId, PortError};
use domain_claims::{
    Claim, ClaimStatus, LedgerGateway, LedgerState, NotificationDispatcher, PreparedRef,
    RiskAnalysis, RiskScorer,
};

/// Scriptable risk scorer
///
/// Pops queued responses in order; an empty queue fails the call, which
/// the orchestrator treats as inconclusive analysis.
#[derive(Default)]
pub struct MockRiskScorer {
    responses: Mutex<Vec<Result<RiskAnalysis, PortError>>>,
    calls: Mutex<Vec<CorrelationId>>,
}

impl MockRiskScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful analysis
    pub fn push_analysis(&self, analysis: RiskAnalysis) {
        self.responses.lock().unwrap().push(Ok(analysis));
    }

    /// Queues a failure
    pub fn push_failure(&self, error: PortError) {
        self.responses.lock().unwrap().push(Err(error));
    }

    /// Correlation ids of the claims analyzed so far
    pub fn analyzed(&self) -> Vec<CorrelationId> {
        self.calls.lock().unwrap().clone()
    }
}

impl DomainPort for MockRiskScorer {}

#[async_trait]
impl RiskScorer for MockRiskScorer {
    async fn analyze(&self, claim: &Claim) -> Result<RiskAnalysis, PortError> {
        self.calls.lock().unwrap().push(claim.correlation_id);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(PortError::timeout("analyze_claim", 30_000));
        }
        responses.remove(0)
    }
}

/// Scriptable ledger gateway
///
/// Prepare calls return sequentially numbered references unless failure
/// is scripted; `get_state` serves the scripted state map, defaulting to
/// `Pending`.
#[derive(Default)]
pub struct MockLedgerGateway {
    counter: AtomicU64,
    fail_submission: AtomicBool,
    fail_settlement: AtomicBool,
    states: Mutex<HashMap<String, LedgerState>>,
    prepared_settlements: Mutex<Vec<(CorrelationId, Money, PartyId)>>,
}

impl MockLedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submission.store(fail, Ordering::SeqCst);
    }

    pub fn fail_settlements(&self, fail: bool) {
        self.fail_settlement.store(fail, Ordering::SeqCst);
    }

    /// Scripts the observed state of a prepared reference
    pub fn set_state(&self, reference: &PreparedRef, state: LedgerState) {
        self.states
            .lock()
            .unwrap()
            .insert(reference.as_str().to_string(), state);
    }

    /// Settlements prepared so far
    pub fn prepared_settlements(&self) -> Vec<(CorrelationId, Money, PartyId)> {
        self.prepared_settlements.lock().unwrap().clone()
    }

    fn next_ref(&self, kind: &str) -> PreparedRef {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        PreparedRef::new(format!("0x{kind}-{n}"))
    }
}

impl DomainPort for MockLedgerGateway {}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn prepare_submission(
        &self,
        _correlation_id: &CorrelationId,
        _claim: &Claim,
    ) -> Result<PreparedRef, PortError> {
        if self.fail_submission.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "ledger gateway".to_string(),
            });
        }
        Ok(self.next_ref("sub"))
    }

    async fn prepare_settlement(
        &self,
        correlation_id: &CorrelationId,
        amount: &Money,
        recipient: &PartyId,
    ) -> Result<PreparedRef, PortError> {
        if self.fail_settlement.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "ledger gateway".to_string(),
            });
        }
        self.prepared_settlements
            .lock()
            .unwrap()
            .push((*correlation_id, *amount, *recipient));
        Ok(self.next_ref("settle"))
    }

    async fn get_state(&self, reference: &PreparedRef) -> Result<LedgerState, PortError> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(reference.as_str())
            .cloned()
            .unwrap_or(LedgerState::Pending))
    }
}

/// Dispatcher that records every transition it is told about
#[derive(Default)]
pub struct RecordingNotifier {
    transitions: Mutex<Vec<(CorrelationId, ClaimStatus, ClaimStatus)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(CorrelationId, ClaimStatus, ClaimStatus)> {
        self.transitions.lock().unwrap().clone()
    }
}

impl DomainPort for RecordingNotifier {}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn claim_status_changed(&self, claim: &Claim, previous: ClaimStatus) {
        self.transitions
            .lock()
            .unwrap()
            .push((claim.correlation_id, previous, claim.status));
    }
}
