// src/cli/status.rs — System status display

use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::ledger::CostLedger;
use crate::infra::config::Config;
use crate::infra::paths;
use crate::store::Store;

/// Display budget state and recent sweeps.
pub fn show_status(
    store: &Arc<Mutex<Store>>,
    config: &Config,
    verbose: bool,
) -> anyhow::Result<()> {
    let db_path = paths::db_path();
    let config_path = paths::config_file_path();
    let script_path = paths::script_path();

    println!("scrimmage v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if config_path.exists() {
        println!("  Config:    {} (loaded)", config_path.display());
    } else {
        println!("  Config:    (using defaults)");
    }
    println!("  Database:  {}", db_path.display());
    if script_path.exists() {
        println!("  Script:    {} (custom)", script_path.display());
    } else {
        println!("  Script:    (built-in playbook)");
    }

    let ledger = CostLedger::new(
        store.clone(),
        config.budget.daily_cap_usd,
        config.budget.throttle_remaining_ratio,
    );
    let state = ledger.budget_state()?;
    println!();
    println!("  Budget:");
    println!(
        "    Today:     ${:.2} spent of ${:.2} cap",
        state.spent_today_usd, state.daily_cap_usd
    );
    println!("    Remaining: ${:.2}", state.remaining_usd);
    if state.is_exceeded {
        println!("    EXCEEDED: new sessions are blocked until tomorrow (UTC)");
    } else if state.is_throttled {
        println!("    Throttled: nearing the daily cap");
    }

    let sweeps = {
        let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        store.recent_sweeps(5)?
    };
    if !sweeps.is_empty() {
        println!();
        println!("  Recent sweeps:");
        for sweep in &sweeps {
            let mut annotations = Vec::new();
            if let Some(reason) = &sweep.halt_reason {
                annotations.push(format!("halted: {reason}"));
            }
            if sweep.ranked_at.is_some() {
                annotations.push("ranked".to_string());
            }
            let suffix = if annotations.is_empty() {
                String::new()
            } else {
                format!("  ({})", annotations.join(", "))
            };
            println!(
                "    {}  {:<9}  {}/{}{}",
                &sweep.id[..8.min(sweep.id.len())],
                sweep.status.to_string(),
                sweep.completed,
                sweep.target_total,
                suffix
            );
        }
    }

    if verbose {
        let (sessions, entries, profiles) = {
            let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
            (
                store.count_sessions()?,
                store.count_ledger_entries()?,
                store.count_profiles()?,
            )
        };
        println!();
        println!("  Totals:");
        println!("    Sessions:       {sessions}");
        println!("    Ledger entries: {entries}");
        println!("    Profiles:       {profiles}");
    }
    Ok(())
}
