// src/scoring/ranking.rs — Top-K selection over a completed sweep
//
// Ranking is deliberately separate from sweep execution: it reads persisted
// sessions, costs one extra judge call, and is safe to retry. The ranked_at
// stamp makes the whole pass idempotent; a sweep is ranked at most once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::cost::calculate_cost;
use crate::core::ledger::CostLedger;
use crate::core::types::{RankedWin, Session, SessionStatus, SweepStatus};
use crate::infra::config::RankingConfig;
use crate::infra::errors::ScrimmageError;
use crate::provider::{ChatRequest, DialogueModel, Message};
use crate::scoring::{parser, render_transcript};
use crate::store::Store;

/// Transcripts handed to the ranking judge in one prompt. The strongest
/// candidates by composite are kept when a sweep produces more wins.
const MAX_JUDGED_CANDIDATES: usize = 12;

const RANKING_TEMPERATURE: f32 = 0.1;
const RANKING_MAX_TOKENS: u32 = 600;

const RANKING_SYSTEM: &str = "You rank transcripts of simulated sales calls. \
You reply with a single JSON array, nothing else.";

#[derive(Debug)]
pub enum RankingOutcome {
    /// The sweep was ranked on a previous run; these are the stored wins
    /// (empty when that run found no successful paths).
    AlreadyRanked(Vec<RankedWin>),
    /// No session met the success bar. Recorded so a retry stays a no-op.
    NoWinners,
    Ranked(Vec<RankedWin>),
}

pub struct RankingPass {
    model: Arc<dyn DialogueModel>,
    ledger: CostLedger,
    judge_model: String,
    config: RankingConfig,
}

impl RankingPass {
    pub fn new(
        model: Arc<dyn DialogueModel>,
        ledger: CostLedger,
        judge_model: String,
        config: RankingConfig,
    ) -> Self {
        Self {
            model,
            ledger,
            judge_model,
            config,
        }
    }

    /// Filter a completed sweep's sessions through the success bar, have the
    /// judge order the survivors, and persist the top K with rationales.
    ///
    /// A judge failure here propagates without stamping ranked_at, so the
    /// pass can simply be run again.
    pub async fn rank_sweep(
        &self,
        store: &Arc<Mutex<Store>>,
        sweep_id: &str,
    ) -> Result<RankingOutcome, ScrimmageError> {
        let sessions = {
            let store = store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            let sweep = store
                .get_sweep(sweep_id)?
                .ok_or_else(|| ScrimmageError::SweepNotFound {
                    id: sweep_id.to_string(),
                })?;
            if sweep.status != SweepStatus::Completed {
                return Err(ScrimmageError::SweepNotRankable {
                    id: sweep_id.to_string(),
                    status: sweep.status.as_str().to_string(),
                });
            }
            if sweep.ranked_at.is_some() {
                return Ok(RankingOutcome::AlreadyRanked(
                    store.ranked_wins_for_sweep(sweep_id)?,
                ));
            }
            store.sessions_for_sweep(sweep_id)?
        };

        let mut candidates: Vec<&Session> = sessions
            .iter()
            .filter(|s| passes_success_bar(&self.config, s))
            .collect();

        if candidates.is_empty() {
            let store = store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            store.mark_sweep_ranked(sweep_id)?;
            tracing::info!(sweep_id, "no successful paths to rank");
            return Ok(RankingOutcome::NoWinners);
        }

        candidates.sort_by(|a, b| {
            b.composite()
                .partial_cmp(&a.composite())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(MAX_JUDGED_CANDIDATES);

        let wins = self.select_top(sweep_id, &candidates).await?;

        {
            let store = store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            for win in &wins {
                store.insert_ranked_win(win)?;
            }
            store.mark_sweep_ranked(sweep_id)?;
        }
        tracing::info!(sweep_id, winners = wins.len(), "ranking complete");
        Ok(RankingOutcome::Ranked(wins))
    }

    async fn select_top(
        &self,
        sweep_id: &str,
        candidates: &[&Session],
    ) -> Result<Vec<RankedWin>, ScrimmageError> {
        let request = ChatRequest {
            model: self.judge_model.clone(),
            messages: vec![Message::user(build_ranking_prompt(
                candidates,
                self.config.top_k,
            ))],
            max_tokens: Some(RANKING_MAX_TOKENS),
            temperature: Some(RANKING_TEMPERATURE),
            system: Some(RANKING_SYSTEM.to_string()),
        };
        let response = self.model.chat(request).await?;

        let cost = calculate_cost(&self.judge_model, &response.usage);
        if let Err(e) = self
            .ledger
            .record_spend(cost, &format!("ranking:{sweep_id}"))
        {
            tracing::warn!(sweep_id, error = %e, "ranking spend not recorded");
        }

        let picks = match parser::parse_ranking(&response.content) {
            Some(p) => p,
            None => return Err(anyhow!("ranking reply had no parseable selection").into()),
        };

        // Judge output is a preference order, not trusted data: unknown ids
        // are dropped, duplicates collapse, ranks are reassigned 1..=K.
        let mut ordered: Vec<(String, u32, String)> = picks
            .into_iter()
            .filter_map(|p| {
                let id = p.session_id?;
                Some((id, p.rank.unwrap_or(u32::MAX), p.rationale.unwrap_or_default()))
            })
            .filter(|(id, _, _)| candidates.iter().any(|s| s.id == *id))
            .collect();
        ordered.sort_by_key(|(_, rank, _)| *rank);
        let mut seen = HashSet::new();
        ordered.retain(|(id, _, _)| seen.insert(id.clone()));
        ordered.truncate(self.config.top_k as usize);

        if ordered.is_empty() {
            return Err(anyhow!("ranking reply named no known sessions").into());
        }

        Ok(ordered
            .into_iter()
            .enumerate()
            .map(|(i, (session_id, _, rationale))| {
                RankedWin::new(sweep_id, session_id, (i + 1) as u32, rationale)
            })
            .collect())
    }
}

/// The success bar, applied per session: completed, scored, composite over
/// the floor, contract signed, and math defense held up.
pub fn passes_success_bar(config: &RankingConfig, session: &Session) -> bool {
    if session.status != SessionStatus::Completed {
        return false;
    }
    let Some(card) = session.scorecard.as_ref() else {
        return false;
    };
    card.composite >= config.min_composite
        && card.contract_signed
        && card.sub_scores.math_defense >= config.min_math_defense
}

fn build_ranking_prompt(candidates: &[&Session], top_k: u32) -> String {
    let mut blocks = String::new();
    for (i, session) in candidates.iter().enumerate() {
        blocks.push_str(&format!(
            "### Candidate {n} (session_id: {id}, composite {composite:.1})\n{transcript}\n\n",
            n = i + 1,
            id = session.id,
            composite = session.composite().unwrap_or(0.0),
            transcript = render_transcript(&session.turns),
        ));
    }

    format!(
        "Below are {count} winning closing calls run from the same playbook. All ended in a \
         signed contract at or under list-price variance limits. Pick the {top_k} most \
         repeatable wins: calls won through technique a human seller could copy, not through \
         a compliant prospect.\n\n\
         {blocks}\
         Reply with exactly one JSON array, strongest first:\n\
         [{{\"session_id\": \"...\", \"rank\": 1, \"rationale\": \"one sentence on why this win transfers\"}}]\n\
         Use only the session_id values shown above.",
        count = candidates.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Role, Scorecard, SubScores};

    fn scored(composite: f64, math: f64, signed: bool, status: SessionStatus) -> Session {
        let mut s = Session::new("profile-1", Some("sweep-1".into()));
        s.status = status;
        s.push_turn(Role::Scripted, "We hold at list.");
        s.push_turn(Role::CounterAgent, "Fine, send it over.");
        s.scorecard = Some(Scorecard {
            sub_scores: SubScores {
                objection_handling: 7.0,
                math_defense: math,
                closing_drive: 8.0,
                humanity: 7.0,
            },
            composite,
            contract_signed: signed,
            price_variance: 0.0,
            rationale: "test".into(),
            winning_excerpt: None,
            scoring_failed: false,
        });
        s
    }

    // ─── success bar ────────────────────────────────────────────

    #[test]
    fn test_success_bar_requires_all_conditions() {
        let config = RankingConfig::default();
        assert!(passes_success_bar(
            &config,
            &scored(85.0, 8.0, true, SessionStatus::Completed)
        ));
        // each condition failing alone sinks the candidate
        assert!(!passes_success_bar(
            &config,
            &scored(69.9, 8.0, true, SessionStatus::Completed)
        ));
        assert!(!passes_success_bar(
            &config,
            &scored(85.0, 5.9, true, SessionStatus::Completed)
        ));
        assert!(!passes_success_bar(
            &config,
            &scored(85.0, 8.0, false, SessionStatus::Completed)
        ));
        assert!(!passes_success_bar(
            &config,
            &scored(85.0, 8.0, true, SessionStatus::AbortedBudget)
        ));
    }

    #[test]
    fn test_success_bar_boundary_values_pass() {
        let config = RankingConfig::default();
        // floors are inclusive
        assert!(passes_success_bar(
            &config,
            &scored(70.0, 6.0, true, SessionStatus::Completed)
        ));
    }

    #[test]
    fn test_success_bar_rejects_unscored() {
        let config = RankingConfig::default();
        let mut s = Session::new("profile-1", Some("sweep-1".into()));
        s.status = SessionStatus::Completed;
        assert!(!passes_success_bar(&config, &s));
    }

    // ─── prompt ─────────────────────────────────────────────────

    #[test]
    fn test_ranking_prompt_numbers_candidates() {
        let a = scored(92.0, 9.0, true, SessionStatus::Completed);
        let b = scored(85.0, 8.0, true, SessionStatus::Completed);
        let candidates = vec![&a, &b];
        let prompt = build_ranking_prompt(&candidates, 3);
        assert!(prompt.contains("Candidate 1"));
        assert!(prompt.contains("Candidate 2"));
        assert!(prompt.contains(&a.id));
        assert!(prompt.contains(&b.id));
        assert!(prompt.contains("composite 92.0"));
        assert!(prompt.contains("AGENT: We hold at list."));
        assert!(prompt.contains("exactly one JSON array"));
    }
}
