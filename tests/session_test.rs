// tests/session_test.rs — Integration test: session orchestrator with a mock model

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scrimmage::core::breaker::CircuitBreaker;
use scrimmage::core::ledger::CostLedger;
use scrimmage::core::script::{Script, ScriptSource};
use scrimmage::core::session::SessionOrchestrator;
use scrimmage::core::types::{CounterProfile, ProfileDials, Role, SessionStatus};
use scrimmage::infra::config::{BreakerConfig, SessionConfig};
use scrimmage::infra::errors::ScrimmageError;
use scrimmage::provider::{ChatRequest, ChatResponse, DialogueModel, TokenUsage};
use scrimmage::scoring::Judge;
use scrimmage::store::Store;

const JUDGE_JSON: &str = r#"{
    "objection_handling": 8,
    "math_defense": 8,
    "closing_drive": 8,
    "humanity": 8,
    "contract_signed": true,
    "price_variance": -1.0,
    "rationale": "Held list price to a signed close.",
    "winning_excerpt": "The math works at list, and the referral credit stays."
}"#;

/// Canned dialogue and judge replies, keyed off the request's model id.
/// Dialogue calls can be told to fail on the Nth call.
struct MockModel {
    calls: AtomicU32,
    fail_on_call: Option<u32>,
    judge_reply: String,
    usage_per_call: TokenUsage,
}

impl MockModel {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_on_call: None,
            judge_reply: JUDGE_JSON.into(),
            usage_per_call: TokenUsage {
                input_tokens: 200,
                output_tokens: 80,
            },
        }
    }

    fn failing_on(call: u32) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    fn with_judge_reply(reply: &str) -> Self {
        Self {
            judge_reply: reply.into(),
            ..Self::new()
        }
    }

    fn with_usage(usage: TokenUsage) -> Self {
        Self {
            usage_per_call: usage,
            ..Self::new()
        }
    }

    fn dialogue_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DialogueModel for MockModel {
    fn id(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ScrimmageError> {
        if request.model == "mock-judge" {
            return Ok(ChatResponse {
                content: self.judge_reply.clone(),
                usage: TokenUsage {
                    input_tokens: 400,
                    output_tokens: 120,
                },
            });
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(ScrimmageError::Provider {
                provider: "mock".into(),
                message: "backend went away".into(),
                retriable: false,
            });
        }
        Ok(ChatResponse {
            content: format!("line {call}"),
            usage: self.usage_per_call.clone(),
        })
    }
}

struct Harness {
    store: Arc<Mutex<Store>>,
    ledger: CostLedger,
    breaker: Arc<CircuitBreaker>,
    orchestrator: SessionOrchestrator,
}

fn harness(model: Arc<MockModel>) -> Harness {
    harness_with(model, 15.0, 1.0)
}

fn harness_with(model: Arc<MockModel>, daily_cap_usd: f64, kill_usd: f64) -> Harness {
    let store = Arc::new(Mutex::new(Store::in_memory().unwrap()));
    let ledger = CostLedger::new(store.clone(), daily_cap_usd, 0.10);
    let breaker = Arc::new(CircuitBreaker::new(&BreakerConfig::default()));
    let config = SessionConfig {
        turn_cap: 6,
        reply_max_tokens: 120,
        temperature: 0.0,
        scripted_model: "mock-dialogue".into(),
        counter_model: "mock-dialogue".into(),
        judge_model: "mock-judge".into(),
    };
    let judge = Judge::new(model.clone(), ledger.clone(), "mock-judge".into());
    let script = Script {
        raw: "Close at list price. Never discount.".into(),
        source: ScriptSource::Default,
    };
    let orchestrator = SessionOrchestrator::new(
        model,
        judge,
        ledger.clone(),
        breaker.clone(),
        store.clone(),
        script,
        config,
        kill_usd,
    );
    Harness {
        store,
        ledger,
        breaker,
        orchestrator,
    }
}

fn prospect() -> CounterProfile {
    CounterProfile::new(
        "test-prospect",
        "Push back on price twice, then agree.",
        ProfileDials::default(),
    )
}

// ─── Happy path ─────────────────────────────────────────────────

#[tokio::test]
async fn test_session_runs_to_turn_cap_and_scores() {
    let model = Arc::new(MockModel::new());
    let h = harness(model.clone());

    let session = h.orchestrator.run(&prospect(), None).await.unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.turns.len(), 6);
    assert_eq!(model.dialogue_calls(), 6);

    // strict alternation, scripted side opens
    for (i, turn) in session.turns.iter().enumerate() {
        let expected = if i % 2 == 0 {
            Role::Scripted
        } else {
            Role::CounterAgent
        };
        assert_eq!(turn.speaker, expected, "turn {i}");
    }

    let card = session.scorecard.as_ref().unwrap();
    assert!(!card.scoring_failed);
    assert!(card.contract_signed);
    // four 8s at weight 2.5 plus the held-price bonus
    assert!((card.composite - 88.0).abs() < 1e-9);
    assert!(card.winning_excerpt.is_some());
}

#[tokio::test]
async fn test_session_persisted_once_with_turns() {
    let h = harness(Arc::new(MockModel::new()));

    let session = h.orchestrator.run(&prospect(), None).await.unwrap();

    let store = h.store.lock().unwrap();
    assert_eq!(store.count_sessions().unwrap(), 1);
    let stored = store.get_session(&session.id).unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.turns.len(), 6);
    assert_eq!(stored.turns[0].text, "line 1");
    assert!((stored.cost_usd - session.cost_usd).abs() < 1e-9);
    assert!(
        (stored.scorecard.unwrap().composite - session.composite().unwrap()).abs() < 1e-9
    );
}

#[tokio::test]
async fn test_session_spend_lands_in_ledger() {
    let h = harness(Arc::new(MockModel::new()));

    let session = h.orchestrator.run(&prospect(), None).await.unwrap();

    // six dialogue spends plus one judge spend, and the session total
    // matches what the ledger saw
    let entries = h.store.lock().unwrap().count_ledger_entries().unwrap();
    assert_eq!(entries, 7);
    let state = h.ledger.budget_state().unwrap();
    assert!(session.cost_usd > 0.0);
    assert!((state.spent_today_usd - session.cost_usd).abs() < 1e-9);
}

// ─── Failure paths ──────────────────────────────────────────────

#[tokio::test]
async fn test_turn_failure_aborts_session() {
    let model = Arc::new(MockModel::failing_on(3));
    let h = harness(model.clone());

    let err = h
        .orchestrator
        .run(&prospect(), Some("probe".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrimmageError::Provider { .. }));

    // aborted session persisted with the turns that did land, no scorecard
    let store = h.store.lock().unwrap();
    let sessions = store.sessions_for_sweep("probe").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::AbortedError);
    assert_eq!(sessions[0].turns.len(), 2);
    assert!(sessions[0].scorecard.is_none());

    // an ordinary turn failure is not a breaker event
    assert!(!h.breaker.local_tripped());
}

#[tokio::test]
async fn test_kill_threshold_stops_runaway_session() {
    // $0.40 per call at default mock pricing; the third call crosses $1
    let model = Arc::new(MockModel::with_usage(TokenUsage {
        input_tokens: 100_000,
        output_tokens: 100_000,
    }));
    let h = harness(model.clone());

    let err = h
        .orchestrator
        .run(&prospect(), Some("probe".into()))
        .await
        .unwrap_err();
    match err {
        ScrimmageError::SessionBudget { spent, limit, .. } => {
            assert!(spent >= limit);
            assert!((limit - 1.0).abs() < 1e-9);
        }
        other => panic!("expected SessionBudget, got {other}"),
    }
    assert_eq!(model.dialogue_calls(), 3);

    let store = h.store.lock().unwrap();
    let sessions = store.sessions_for_sweep("probe").unwrap();
    assert_eq!(sessions[0].status, SessionStatus::AbortedBudget);
    // the killing call's reply is spend, not transcript
    assert_eq!(sessions[0].turns.len(), 2);
    assert!((sessions[0].cost_usd - 1.2).abs() < 1e-9);

    // runaway spend trips the breaker for everyone
    assert!(h.breaker.local_tripped());
}

#[tokio::test]
async fn test_scoring_failure_yields_zero_card() {
    let model = Arc::new(MockModel::with_judge_reply(
        "I cannot evaluate this call, sorry.",
    ));
    let h = harness(model);

    let session = h.orchestrator.run(&prospect(), None).await.unwrap();

    // the session itself still completes with its full transcript
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.turns.len(), 6);
    let card = session.scorecard.as_ref().unwrap();
    assert!(card.scoring_failed);
    assert_eq!(card.composite, 0.0);
    assert!(!card.contract_signed);
}

// ─── Admission ──────────────────────────────────────────────────

#[tokio::test]
async fn test_tripped_breaker_blocks_before_first_turn() {
    let model = Arc::new(MockModel::new());
    let h = harness(model.clone());
    h.breaker.trip("manual stop");

    let err = h.orchestrator.run(&prospect(), None).await.unwrap_err();
    assert!(matches!(err, ScrimmageError::BreakerTripped));

    // nothing ran, nothing persisted, nothing spent
    assert_eq!(model.dialogue_calls(), 0);
    let store = h.store.lock().unwrap();
    assert_eq!(store.count_sessions().unwrap(), 0);
    assert_eq!(store.count_ledger_entries().unwrap(), 0);
}

#[tokio::test]
async fn test_exhausted_daily_budget_blocks_admission() {
    let model = Arc::new(MockModel::new());
    let h = harness_with(model.clone(), 1.0, 5.0);
    h.ledger.record_spend(1.5, "earlier-today").unwrap();

    let err = h.orchestrator.run(&prospect(), None).await.unwrap_err();
    assert!(matches!(err, ScrimmageError::DailyBudgetExceeded { .. }));

    assert_eq!(model.dialogue_calls(), 0);
    assert_eq!(h.store.lock().unwrap().count_sessions().unwrap(), 0);
    // exhaustion also trips the breaker
    assert!(h.breaker.local_tripped());
}
