//! End-to-end lifecycle tests driven on the paused tokio clock
//!
//! Intake, analysis, voting, and resolution all run through the real
//! orchestrator and governance engine; only the store and the outbound
//! gateways are test doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use core_kernel::{ClaimId, CorrelationId, Currency, Money, PartyId, PortError};
use domain_claims::{
    Claim, ClaimError, ClaimStatistics, ClaimStatus, ClaimStore, InMemoryClaimStore,
    SnapshotSource,
};
use domain_governance::{GovernanceEngine, ProposalStatus, VoteChoice};
use orchestrator::{resume_monitors, ClaimOrchestrator, OrchestratorConfig};
use test_utils::{
    fraudulent_analysis, low_risk_analysis, ClaimRequestBuilder, MockLedgerGateway,
    MockRiskScorer, RecordingNotifier,
};

struct Harness {
    orchestrator: Arc<ClaimOrchestrator>,
    store: Arc<InMemoryClaimStore>,
    scorer: Arc<MockRiskScorer>,
    ledger: Arc<MockLedgerGateway>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(config: OrchestratorConfig) -> Harness {
    let store = Arc::new(InMemoryClaimStore::new());
    let scorer = Arc::new(MockRiskScorer::new());
    let ledger = Arc::new(MockLedgerGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let orchestrator = Arc::new(ClaimOrchestrator::new(
        Arc::clone(&store) as Arc<dyn ClaimStore>,
        Arc::clone(&scorer) as _,
        Arc::clone(&ledger) as _,
        Arc::new(GovernanceEngine::new()),
        Arc::clone(&notifier) as _,
        config,
    ));

    Harness {
        orchestrator,
        store,
        scorer,
        ledger,
        notifier,
    }
}

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// Polls the store on the paused clock until the claim satisfies `pred`
async fn wait_until<F>(store: &Arc<InMemoryClaimStore>, id: &CorrelationId, pred: F) -> Claim
where
    F: Fn(&Claim) -> bool,
{
    for _ in 0..4000 {
        if let Ok(claim) = store.get_by_correlation(id).await {
            if pred(&claim) {
                return claim;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("claim {id} never reached the expected state");
}

async fn wait_for_status(
    store: &Arc<InMemoryClaimStore>,
    id: &CorrelationId,
    status: ClaimStatus,
) -> Claim {
    wait_until(store, id, |c| c.status == status).await
}

async fn wait_for_proposal(store: &Arc<InMemoryClaimStore>, id: &CorrelationId) -> Claim {
    wait_until(store, id, |c| c.proposal_id.is_some()).await
}

#[tokio::test(start_paused = true)]
async fn approved_claim_is_paid_with_suggested_amount() {
    let h = harness(OrchestratorConfig::default());
    h.scorer.push_analysis(low_risk_analysis(usd(dec!(1000))));

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::Submitted);
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();
    wait_for_status(&h.store, &id, ClaimStatus::AiValidated).await;

    let governance = h.orchestrator.governance();
    for (choice, power) in [
        (VoteChoice::For, dec!(1500)),
        (VoteChoice::For, dec!(500)),
        (VoteChoice::Against, dec!(500)),
    ] {
        governance
            .cast_vote(proposal_id, PartyId::new(), choice, power, None)
            .await
            .unwrap();
    }

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Paid).await;
    assert_eq!(claim.approved_amount, Some(usd(dec!(1000))));
    assert!(claim.ledger.submission_ref.is_some());
    assert!(claim.ledger.settlement_ref.is_some());

    let settlements = h.ledger.prepared_settlements();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].1, usd(dec!(1000)));

    let transitions: Vec<(ClaimStatus, ClaimStatus)> = h
        .notifier
        .transitions()
        .into_iter()
        .map(|(_, from, to)| (from, to))
        .collect();
    assert!(transitions.contains(&(ClaimStatus::Submitted, ClaimStatus::AiValidated)));
    assert!(transitions.contains(&(ClaimStatus::AiValidated, ClaimStatus::Approved)));
    assert!(transitions.contains(&(ClaimStatus::Approved, ClaimStatus::Paid)));
}

#[tokio::test(start_paused = true)]
async fn payout_is_capped_at_the_requested_amount() {
    let h = harness(OrchestratorConfig::default());
    // Scorer suggests more than was asked for
    h.scorer.push_analysis(low_risk_analysis(usd(dec!(2000))));

    let claim = h
        .orchestrator
        .clone()
        .intake(
            ClaimRequestBuilder::new()
                .with_requested_amount(Some(usd(dec!(1250))))
                .build(),
        )
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();
    wait_for_status(&h.store, &id, ClaimStatus::AiValidated).await;

    let governance = h.orchestrator.governance();
    for _ in 0..3 {
        governance
            .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(100), None)
            .await
            .unwrap();
    }

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Paid).await;
    assert_eq!(claim.approved_amount, Some(usd(dec!(1250))));
}

#[tokio::test(start_paused = true)]
async fn high_fraud_score_flags_the_claim_and_voters_reject_it() {
    let h = harness(OrchestratorConfig::default());
    h.scorer.push_analysis(fraudulent_analysis(Currency::USD));

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();
    wait_for_status(&h.store, &id, ClaimStatus::AiRejected).await;

    let governance = h.orchestrator.governance();
    for _ in 0..3 {
        governance
            .cast_vote(
                proposal_id,
                PartyId::new(),
                VoteChoice::Against,
                dec!(100),
                None,
            )
            .await
            .unwrap();
    }

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Rejected).await;
    assert_eq!(claim.resolution_reason.as_deref(), Some("community vote against"));
    assert!(h.ledger.prepared_settlements().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scorer_failure_routes_the_claim_to_manual_review() {
    let h = harness(OrchestratorConfig::default());
    h.scorer
        .push_failure(PortError::timeout("analyze_claim", 30_000));

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();

    let claim = wait_for_status(&h.store, &claim.correlation_id, ClaimStatus::UnderReview).await;
    assert!(claim.risk_analysis.is_none());
}

#[tokio::test(start_paused = true)]
async fn claim_without_evidence_skips_automated_analysis() {
    let h = harness(OrchestratorConfig::default());

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();

    let claim = wait_for_proposal(&h.store, &claim.correlation_id).await;
    assert_eq!(claim.status, ClaimStatus::Submitted);
    assert!(h.scorer.analyzed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missed_quorum_extends_once_then_rejects() {
    let config = OrchestratorConfig {
        voting_window: chrono::Duration::seconds(60),
        window_extension: chrono::Duration::seconds(60),
        ..OrchestratorConfig::default()
    };
    let h = harness(config);

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();

    // One vote; quorum needs three
    h.orchestrator
        .governance()
        .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(1000), None)
        .await
        .unwrap();

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Rejected).await;
    assert_eq!(claim.resolution_reason.as_deref(), Some("no quorum"));

    let (proposal, tally) = h.orchestrator.governance().get(proposal_id).await.unwrap();
    assert_eq!(proposal.extensions, 1);
    assert_eq!(tally.total_votes, 1);
}

#[tokio::test(start_paused = true)]
async fn tally_exactly_at_threshold_rejects_when_the_window_closes() {
    let config = OrchestratorConfig {
        voting_window: chrono::Duration::seconds(60),
        ..OrchestratorConfig::default()
    }
    .with_minimum_votes(2);
    let h = harness(config);

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();

    // 600 for / 400 against is exactly the 0.6 threshold, which does not
    // pass
    let governance = h.orchestrator.governance();
    governance
        .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(600), None)
        .await
        .unwrap();
    governance
        .cast_vote(
            proposal_id,
            PartyId::new(),
            VoteChoice::Against,
            dec!(400),
            None,
        )
        .await
        .unwrap();

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Rejected).await;
    assert_eq!(
        claim.resolution_reason.as_deref(),
        Some("community vote against")
    );

    let (proposal, _) = governance.get(proposal_id).await.unwrap();
    assert_eq!(proposal.status, ProposalStatus::Rejected);
}

#[tokio::test(start_paused = true)]
async fn settlement_outage_leaves_the_claim_approved_until_retried() {
    let h = harness(OrchestratorConfig::default());
    h.scorer.push_analysis(low_risk_analysis(usd(dec!(800))));
    h.ledger.fail_settlements(true);

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();
    wait_for_status(&h.store, &id, ClaimStatus::AiValidated).await;

    let governance = h.orchestrator.governance();
    for _ in 0..3 {
        governance
            .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(100), None)
            .await
            .unwrap();
    }

    let claim = wait_for_status(&h.store, &id, ClaimStatus::Approved).await;
    assert_eq!(claim.approved_amount, Some(usd(dec!(800))));
    assert!(claim.ledger.settlement_ref.is_none());

    // Still approved while the gateway is down; retrying surfaces the
    // gateway failure and does not regress the claim
    let result = h.orchestrator.retry_settlement(&id).await;
    assert!(matches!(result, Err(ClaimError::Store(_))));
    let claim = h.store.get_by_correlation(&id).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Approved);

    // Gateway recovers; an explicit retry pays the claim
    h.ledger.fail_settlements(false);
    let claim = h.orchestrator.retry_settlement(&id).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Paid);
    assert!(claim.ledger.settlement_ref.is_some());
}

#[tokio::test(start_paused = true)]
async fn settlement_retry_rejects_claims_not_awaiting_settlement() {
    let h = harness(OrchestratorConfig::default());

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();

    let result = h.orchestrator.retry_settlement(&claim.correlation_id).await;
    assert!(matches!(result, Err(ClaimError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn submission_outage_does_not_block_the_claim() {
    let h = harness(OrchestratorConfig::default());
    h.ledger.fail_submissions(true);
    h.scorer.push_analysis(low_risk_analysis(usd(dec!(500))));

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_status(&h.store, &id, ClaimStatus::AiValidated).await;
    assert!(claim.ledger.submission_ref.is_none());
    assert!(claim.proposal_id.is_some());
}

#[tokio::test(start_paused = true)]
async fn duplicate_idempotency_key_is_rejected() {
    let h = harness(OrchestratorConfig::default());

    let first = ClaimRequestBuilder::new()
        .with_idempotency_key("intake-42")
        .build();
    h.orchestrator.clone().intake(first).await.unwrap();

    let second = ClaimRequestBuilder::new()
        .with_idempotency_key("intake-42")
        .build();
    let result = h.orchestrator.clone().intake(second).await;
    assert!(matches!(result, Err(ClaimError::DuplicateClaim(key)) if key == "intake-42"));
}

#[tokio::test(start_paused = true)]
async fn resumed_monitor_finishes_an_open_claim() {
    let h = harness(OrchestratorConfig::default());

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();

    // Simulate a restart: kill every monitor, then rebuild from the store
    h.orchestrator.monitors().shutdown();
    let resumed = resume_monitors(&h.orchestrator).await.unwrap();
    assert_eq!(resumed, 1);

    let governance = h.orchestrator.governance();
    for _ in 0..3 {
        governance
            .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(100), None)
            .await
            .unwrap();
    }

    wait_for_status(&h.store, &id, ClaimStatus::Paid).await;
}

/// Store wrapper whose reads can be switched to transient failures
struct FlakyStore {
    inner: InMemoryClaimStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryClaimStore::new(),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ClaimError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ClaimError::Store(PortError::connection(
                "claim store connection refused",
            )));
        }
        Ok(())
    }
}

impl core_kernel::DomainPort for FlakyStore {}

#[async_trait]
impl ClaimStore for FlakyStore {
    async fn insert(
        &self,
        claim: Claim,
        idempotency_key: Option<&str>,
    ) -> Result<Claim, ClaimError> {
        self.check()?;
        self.inner.insert(claim, idempotency_key).await
    }

    async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn get_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Claim, ClaimError> {
        self.check()?;
        self.inner.get_by_correlation(correlation_id).await
    }

    async fn update(&self, claim: &Claim) -> Result<Claim, ClaimError> {
        self.check()?;
        self.inner.update(claim).await
    }

    async fn list_open_with_proposal(&self) -> Result<Vec<Claim>, ClaimError> {
        self.check()?;
        self.inner.list_open_with_proposal().await
    }

    async fn statistics(&self) -> Result<ClaimStatistics, ClaimError> {
        self.check()?;
        self.inner.statistics().await
    }
}

#[tokio::test(start_paused = true)]
async fn unreachable_store_serves_a_flagged_fallback_snapshot() {
    let store = Arc::new(FlakyStore::new());
    let orchestrator = Arc::new(ClaimOrchestrator::new(
        Arc::clone(&store) as Arc<dyn ClaimStore>,
        Arc::new(MockRiskScorer::new()),
        Arc::new(MockLedgerGateway::new()),
        Arc::new(GovernanceEngine::new()),
        Arc::new(RecordingNotifier::new()),
        OrchestratorConfig::default(),
    ));

    let claim = orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().without_evidence().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    store.set_down(true);
    let snapshot = orchestrator.get_claim(&id).await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Fallback);
    assert_eq!(snapshot.status, ClaimStatus::UnderReview);

    store.set_down(false);
    let snapshot = orchestrator.get_claim(&id).await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Store);
    assert_eq!(snapshot.status, ClaimStatus::Submitted);

    // An unknown claim still fails even while the store is healthy
    let missing = CorrelationId::new();
    assert!(matches!(
        orchestrator.get_claim(&missing).await,
        Err(ClaimError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn statistics_track_resolved_claims() {
    let h = harness(OrchestratorConfig::default());
    h.scorer.push_analysis(low_risk_analysis(usd(dec!(300))));

    let claim = h
        .orchestrator
        .clone()
        .intake(ClaimRequestBuilder::new().build())
        .await
        .unwrap();
    let id = claim.correlation_id;

    let claim = wait_for_proposal(&h.store, &id).await;
    let proposal_id = claim.proposal_id.unwrap();
    wait_for_status(&h.store, &id, ClaimStatus::AiValidated).await;

    let governance = h.orchestrator.governance();
    for _ in 0..3 {
        governance
            .cast_vote(proposal_id, PartyId::new(), VoteChoice::For, dec!(100), None)
            .await
            .unwrap();
    }
    wait_for_status(&h.store, &id, ClaimStatus::Paid).await;

    let stats = h.orchestrator.statistics().await.unwrap();
    assert_eq!(stats.total_claims, 1);
    assert_eq!(stats.paid_claims, 1);
    assert_eq!(stats.pending_claims, 0);
    assert_eq!(stats.total_paid_amount, dec!(300));
    assert_eq!(stats.approval_rate, dec!(1));
}
