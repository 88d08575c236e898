// src/cli/sweep.rs — Run a batch sweep

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::cli::{profiles, rank};
use crate::core::breaker::CircuitBreaker;
use crate::core::ledger::CostLedger;
use crate::core::script;
use crate::core::session::SessionOrchestrator;
use crate::core::sweep::{SweepCoordinator, SweepOutcome};
use crate::core::types::{CounterProfile, Session, SweepStatus};
use crate::infra::config::Config;
use crate::notify;
use crate::provider::DialogueModel;
use crate::scoring::Judge;
use crate::store::Store;

#[allow(clippy::too_many_arguments)]
pub async fn run_sweep(
    model: Arc<dyn DialogueModel>,
    store: Arc<Mutex<Store>>,
    config: &Config,
    total: u32,
    profile_keys: &[String],
    script_path: Option<&Path>,
    rank_after: bool,
) -> anyhow::Result<()> {
    profiles::ensure_seeded(&store)?;
    let roster: Vec<CounterProfile> = if profile_keys.is_empty() {
        let store_guard = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        store_guard.list_profiles()?
    } else {
        let mut picked = Vec::with_capacity(profile_keys.len());
        for key in profile_keys {
            picked.push(profiles::resolve_profile(&store, key)?);
        }
        picked
    };

    let script = script::load_script(script_path)?;
    tracing::debug!(source = %script.source, "script loaded");

    let ledger = CostLedger::new(
        store.clone(),
        config.budget.daily_cap_usd,
        config.budget.throttle_remaining_ratio,
    );
    let breaker = Arc::new(CircuitBreaker::new(&config.breaker));
    let notifier = notify::from_config(&config.notify);
    let judge = Judge::new(
        model.clone(),
        ledger.clone(),
        config.session.judge_model.clone(),
    );
    let orchestrator = SessionOrchestrator::new(
        model.clone(),
        judge,
        ledger.clone(),
        breaker.clone(),
        store.clone(),
        script,
        config.session.clone(),
        config.budget.session_kill_usd,
    );
    let coordinator = SweepCoordinator::new(
        orchestrator,
        ledger,
        breaker,
        store.clone(),
        notifier,
        config.sweep.clone(),
    );

    eprintln!(
        "[sweep] {} sessions, {} per group, {} profile(s)",
        total,
        config.sweep.batch_size,
        roster.len()
    );
    let outcome = coordinator.run(&roster, total).await?;
    print_report(&outcome);

    if rank_after {
        if outcome.record.status == SweepStatus::Completed {
            println!();
            rank::run_rank(model, store, config, &outcome.record.id).await?;
        } else {
            eprintln!("[rank] skipped: sweep did not complete");
        }
    }
    Ok(())
}

fn print_report(outcome: &SweepOutcome) {
    let report = &outcome.report;
    println!("sweep {}", outcome.record.id);
    println!("  status:    {}", outcome.record.status);
    println!("  attempted: {}", report.attempted);
    println!("  completed: {}", report.completed);
    println!("  failed:    {}", report.failed);
    println!("  cost:      ${:.4}", report.total_cost_usd);
    if let Some(halt) = &report.halt {
        println!("  halted:    {halt}");
    }

    let mut scored: Vec<&Session> = outcome
        .results
        .iter()
        .flatten()
        .filter(|s| s.scorecard.is_some())
        .collect();
    if scored.is_empty() {
        return;
    }
    scored.sort_by(|a, b| {
        b.composite()
            .partial_cmp(&a.composite())
            .unwrap_or(Ordering::Equal)
    });
    println!("  best composites:");
    for session in scored.iter().take(3) {
        println!(
            "    {:>5.1}  {}",
            session.composite().unwrap_or(0.0),
            session.id
        );
    }
}
