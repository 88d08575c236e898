// src/cli/run.rs — Run a single session and print its scorecard

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::cli::profiles;
use crate::core::breaker::CircuitBreaker;
use crate::core::ledger::CostLedger;
use crate::core::script;
use crate::core::session::SessionOrchestrator;
use crate::core::types::Session;
use crate::infra::config::Config;
use crate::provider::DialogueModel;
use crate::scoring::{render_transcript, Judge};
use crate::store::Store;

pub async fn run_session(
    model: Arc<dyn DialogueModel>,
    store: Arc<Mutex<Store>>,
    config: &Config,
    profile_key: Option<&str>,
    script_path: Option<&Path>,
    show_transcript: bool,
) -> anyhow::Result<()> {
    profiles::ensure_seeded(&store)?;
    let profile = match profile_key {
        Some(key) => profiles::resolve_profile(&store, key)?,
        None => {
            let listed = {
                let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
                store.list_profiles()?
            };
            listed
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no counter profiles available"))?
        }
    };

    let script = script::load_script(script_path)?;
    tracing::debug!(source = %script.source, chars = script.raw.len(), "script loaded");

    let ledger = CostLedger::new(
        store.clone(),
        config.budget.daily_cap_usd,
        config.budget.throttle_remaining_ratio,
    );
    let breaker = Arc::new(CircuitBreaker::new(&config.breaker));
    let judge = Judge::new(
        model.clone(),
        ledger.clone(),
        config.session.judge_model.clone(),
    );
    let orchestrator = SessionOrchestrator::new(
        model,
        judge,
        ledger.clone(),
        breaker,
        store,
        script,
        config.session.clone(),
        config.budget.session_kill_usd,
    );

    eprintln!(
        "[session] vs {} | up to {} turns",
        profile.name, config.session.turn_cap
    );
    let session = orchestrator.run(&profile, None).await?;

    print_scorecard(&session, &profile.name);
    if show_transcript {
        println!();
        println!("{}", render_transcript(&session.turns));
    }

    let state = ledger.budget_state()?;
    eprintln!(
        "[budget] ${:.2} spent today of ${:.2} cap",
        state.spent_today_usd, state.daily_cap_usd
    );
    Ok(())
}

fn print_scorecard(session: &Session, profile_name: &str) {
    println!("session {}", session.id);
    println!("  profile:   {}", profile_name);
    println!("  turns:     {}", session.turns.len());
    println!("  cost:      ${:.4}", session.cost_usd);

    let Some(card) = session.scorecard.as_ref() else {
        return;
    };
    if card.scoring_failed {
        println!("  scoring:   FAILED ({})", card.rationale);
        return;
    }

    println!("  composite: {:.1} / 100", card.composite);
    println!(
        "  subs:      objection {:.1} | math {:.1} | closing {:.1} | humanity {:.1}",
        card.sub_scores.objection_handling,
        card.sub_scores.math_defense,
        card.sub_scores.closing_drive,
        card.sub_scores.humanity
    );
    if card.contract_signed {
        println!("  outcome:   SIGNED (price variance {:+.1}%)", card.price_variance);
    } else {
        println!("  outcome:   no close");
    }
    if let Some(excerpt) = &card.winning_excerpt {
        println!("  best line: \"{excerpt}\"");
    }
    if !card.rationale.is_empty() {
        println!("  judge:     {}", card.rationale);
    }
}
