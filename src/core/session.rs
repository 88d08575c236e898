// src/core/session.rs — One dialogue session, turn by turn
//
// The orchestrator drives a scripted seller and a generated counter-agent
// through a fixed number of alternating turns, meters spend after every
// model call, and hands the finished transcript to the judge. Sessions are
// persisted exactly once, at their terminal state.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::breaker::CircuitBreaker;
use crate::core::cost::calculate_cost;
use crate::core::ledger::CostLedger;
use crate::core::script::Script;
use crate::core::types::{CounterProfile, Role, Session, SessionStatus};
use crate::infra::config::SessionConfig;
use crate::infra::errors::ScrimmageError;
use crate::provider::{ChatRequest, DialogueModel, Message};
use crate::scoring::Judge;
use crate::store::Store;

/// Stand-in for the missing opposing turn on the session's first call.
const OPENING_CUE: &str = "(The prospect has just picked up the phone. Open the call.)";

const REPLY_FRAMING: &str =
    "You are on a live phone call. Reply with your next spoken line only: no stage directions, \
     no notes, no speaker tag.";

/// Per-role request parameters, fixed for the whole session.
struct RoleAgent {
    system: String,
    model: String,
}

struct RolePair {
    scripted: RoleAgent,
    counter: RoleAgent,
}

impl RolePair {
    fn get(&self, role: Role) -> &RoleAgent {
        match role {
            Role::Scripted => &self.scripted,
            Role::CounterAgent => &self.counter,
        }
    }
}

pub struct SessionOrchestrator {
    model: Arc<dyn DialogueModel>,
    judge: Judge,
    ledger: CostLedger,
    breaker: Arc<CircuitBreaker>,
    store: Arc<Mutex<Store>>,
    script: Script,
    config: SessionConfig,
    kill_threshold_usd: f64,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Arc<dyn DialogueModel>,
        judge: Judge,
        ledger: CostLedger,
        breaker: Arc<CircuitBreaker>,
        store: Arc<Mutex<Store>>,
        script: Script,
        config: SessionConfig,
        kill_threshold_usd: f64,
    ) -> Self {
        Self {
            model,
            judge,
            ledger,
            breaker,
            store,
            script,
            config,
            kill_threshold_usd,
        }
    }

    /// Run one session against the given profile to the turn cap, then score
    /// it. A turn failure or kill-threshold breach aborts the session and
    /// propagates; the caller decides what that means for any siblings.
    pub async fn run(
        &self,
        profile: &CounterProfile,
        sweep_id: Option<String>,
    ) -> Result<Session, ScrimmageError> {
        self.admit()?;
        if self.breaker.is_tripped().await {
            return Err(ScrimmageError::BreakerTripped);
        }

        let agents = build_agents(&self.script, &self.config, profile);
        let mut session = Session::new(profile.id.as_str(), sweep_id);
        session.status = SessionStatus::Running;
        tracing::info!(
            session_id = %session.id,
            profile = %profile.name,
            turn_cap = self.config.turn_cap,
            "session start"
        );

        let mut active = Role::Scripted;
        for turn_no in 0..self.config.turn_cap {
            let agent = agents.get(active);
            let request = self.turn_request(agent, &session, active);

            let response = match self.model.chat(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.id,
                        turn = turn_no,
                        error = %e,
                        "turn failed; aborting session"
                    );
                    session.status = SessionStatus::AbortedError;
                    self.persist_aborted(&session);
                    return Err(e);
                }
            };

            let cost = calculate_cost(&agent.model, &response.usage);
            self.ledger.record_spend(cost, &session.id)?;
            session.record_usage(&response.usage, cost);

            // Kill check runs before the turn text lands: a runaway loop's
            // final reply is spend, not transcript.
            if session.cost_usd >= self.kill_threshold_usd {
                session.status = SessionStatus::AbortedBudget;
                self.breaker.trip("session kill threshold breached");
                self.persist_aborted(&session);
                return Err(ScrimmageError::SessionBudget {
                    session_id: session.id.clone(),
                    spent: session.cost_usd,
                    limit: self.kill_threshold_usd,
                });
            }

            tracing::debug!(
                session_id = %session.id,
                turn = turn_no,
                speaker = active.label(),
                cost_usd = cost,
                "turn complete"
            );
            session.push_turn(active, response.content);
            active = active.flip();
        }

        let (card, judge_cost) = self.judge.score(&session).await;
        session.cost_usd += judge_cost;
        session.scorecard = Some(card);
        session.status = SessionStatus::Completed;
        self.persist(&session)?;

        tracing::info!(
            session_id = %session.id,
            composite = session.composite().unwrap_or(0.0),
            cost_usd = session.cost_usd,
            "session complete"
        );
        Ok(session)
    }

    /// Admission check against the daily ledger. Exhaustion trips the breaker
    /// so concurrent siblings stop launching too.
    fn admit(&self) -> Result<(), ScrimmageError> {
        let state = self.ledger.budget_state()?;
        if state.is_exceeded {
            self.breaker.trip("daily budget exhausted");
            return Err(ScrimmageError::DailyBudgetExceeded {
                spent: state.spent_today_usd,
                cap: state.daily_cap_usd,
            });
        }
        Ok(())
    }

    /// Bounded context: each reply sees only the opposing side's last turn.
    /// Keeps per-turn cost flat regardless of the turn cap.
    fn turn_request(&self, agent: &RoleAgent, session: &Session, active: Role) -> ChatRequest {
        let heard = session
            .last_turn_of(active.flip())
            .map(|t| t.text.clone())
            .unwrap_or_else(|| OPENING_CUE.to_string());

        ChatRequest {
            model: agent.model.clone(),
            messages: vec![Message::user(heard)],
            max_tokens: Some(self.config.reply_max_tokens),
            temperature: Some(self.config.temperature),
            system: Some(agent.system.clone()),
        }
    }

    fn persist(&self, session: &Session) -> Result<(), ScrimmageError> {
        let store = self
            .store
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        store.insert_session(session)?;
        Ok(())
    }

    /// Aborted sessions still get a row, but a storage failure here must not
    /// mask the abort that caused it.
    fn persist_aborted(&self, session: &Session) {
        if let Err(e) = self.persist(session) {
            tracing::warn!(
                session_id = %session.id,
                error = %e,
                "aborted session not persisted"
            );
        }
    }
}

fn build_agents(script: &Script, config: &SessionConfig, profile: &CounterProfile) -> RolePair {
    RolePair {
        scripted: RoleAgent {
            system: format!("{}\n\n{}", script.raw.trim_end(), REPLY_FRAMING),
            model: config.scripted_model.clone(),
        },
        counter: RoleAgent {
            system: format!(
                "You are the prospect on a sales call. Persona: {name}.\n{instructions}\n\n\
                 Behavioral dials: {dials}.\nStay in character for the whole call.\n\n{framing}",
                name = profile.name,
                instructions = profile.instructions.trim(),
                dials = profile.dials.render(),
                framing = REPLY_FRAMING,
            ),
            model: config.counter_model.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::ScriptSource;
    use crate::core::types::ProfileDials;

    #[test]
    fn test_system_prompts_carry_script_and_persona() {
        let script = Script {
            raw: "Always close at list price.\n".into(),
            source: ScriptSource::Default,
        };
        let config = SessionConfig {
            scripted_model: "model-a".into(),
            counter_model: "model-b".into(),
            ..SessionConfig::default()
        };
        let profile = CounterProfile::new(
            "stonewaller",
            "Give one-word answers until the agent earns more.",
            ProfileDials {
                hostility: 6,
                patience: 2,
                price_sensitivity: 5,
            },
        );

        let pair = build_agents(&script, &config, &profile);
        assert!(pair.get(Role::Scripted).system.contains("list price"));
        assert!(pair.get(Role::Scripted).system.contains("next spoken line"));
        assert_eq!(pair.get(Role::Scripted).model, "model-a");

        let counter = pair.get(Role::CounterAgent);
        assert!(counter.system.contains("Persona: stonewaller"));
        assert!(counter.system.contains("one-word answers"));
        assert!(counter.system.contains("hostility 6/10"));
        assert_eq!(counter.model, "model-b");
    }
}
