// src/cli/rank.rs — Rank the winners of a completed sweep

use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::ledger::CostLedger;
use crate::core::types::RankedWin;
use crate::infra::config::Config;
use crate::provider::DialogueModel;
use crate::scoring::ranking::{RankingOutcome, RankingPass};
use crate::store::Store;

pub async fn run_rank(
    model: Arc<dyn DialogueModel>,
    store: Arc<Mutex<Store>>,
    config: &Config,
    sweep_id: &str,
) -> anyhow::Result<()> {
    let ledger = CostLedger::new(
        store.clone(),
        config.budget.daily_cap_usd,
        config.budget.throttle_remaining_ratio,
    );
    let pass = RankingPass::new(
        model,
        ledger,
        config.session.judge_model.clone(),
        config.ranking.clone(),
    );

    match pass.rank_sweep(&store, sweep_id).await? {
        RankingOutcome::NoWinners => {
            println!("no successful paths: no session of sweep {sweep_id} met the success bar.");
        }
        RankingOutcome::AlreadyRanked(wins) if wins.is_empty() => {
            println!("sweep {sweep_id} was already ranked: no successful paths.");
        }
        RankingOutcome::AlreadyRanked(wins) => {
            println!("sweep {sweep_id} was already ranked; stored winners:");
            print_wins(&store, &wins)?;
        }
        RankingOutcome::Ranked(wins) => {
            println!("top {} of sweep {}:", wins.len(), sweep_id);
            print_wins(&store, &wins)?;
        }
    }
    Ok(())
}

fn print_wins(store: &Arc<Mutex<Store>>, wins: &[RankedWin]) -> anyhow::Result<()> {
    let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
    for win in wins {
        println!();
        println!("  #{}  session {}", win.rank, win.session_id);
        println!("      {}", win.rationale);
        if let Some(session) = store.get_session(&win.session_id)? {
            if let Some(card) = session.scorecard {
                println!(
                    "      composite {:.1}, price variance {:+.1}%",
                    card.composite, card.price_variance
                );
                if let Some(excerpt) = card.winning_excerpt {
                    println!("      best line: \"{excerpt}\"");
                }
            }
        }
    }
    Ok(())
}
