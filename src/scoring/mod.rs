// src/scoring/mod.rs — Judge-driven scoring pipeline
//
// Scoring is a post-pass over a finished transcript: one judge call, one
// parse, one deterministic normalization. Nothing in this module can fail a
// session; every failure path collapses into the zero card.

pub mod normalize;
pub mod parser;
pub mod ranking;

use std::sync::Arc;

use crate::core::cost::calculate_cost;
use crate::core::ledger::CostLedger;
use crate::core::types::{Scorecard, Session, Turn};
use crate::provider::{ChatRequest, DialogueModel, Message};

/// Judge calls are scoring, not dialogue: near-greedy sampling keeps two
/// scorings of the same transcript close.
const JUDGE_TEMPERATURE: f32 = 0.1;
const JUDGE_MAX_TOKENS: u32 = 700;

const JUDGE_SYSTEM: &str = "You are a strict evaluator of simulated sales calls. \
You follow the scoring rubric exactly and reply with a single JSON object, nothing else.";

/// Render turns as a speaker-tagged transcript, one line per turn. Shared by
/// the scoring and ranking prompts and the CLI transcript view.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.speaker.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scores finished sessions with a dedicated judge model.
pub struct Judge {
    model: Arc<dyn DialogueModel>,
    ledger: CostLedger,
    judge_model: String,
}

impl Judge {
    pub fn new(model: Arc<dyn DialogueModel>, ledger: CostLedger, judge_model: String) -> Self {
        Self {
            model,
            ledger,
            judge_model,
        }
    }

    /// Score a finished session. Returns the card plus the judge call's cost
    /// so the caller can fold it into the session total.
    ///
    /// Never fails: a judge transport error or unparsable reply degrades to
    /// the zero card with the reason in its rationale.
    pub async fn score(&self, session: &Session) -> (Scorecard, f64) {
        let request = ChatRequest {
            model: self.judge_model.clone(),
            messages: vec![Message::user(build_scoring_prompt(&session.turns))],
            max_tokens: Some(JUDGE_MAX_TOKENS),
            temperature: Some(JUDGE_TEMPERATURE),
            system: Some(JUDGE_SYSTEM.to_string()),
        };

        let response = match self.model.chat(request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "judge call failed");
                return (Scorecard::failure(format!("judge call failed: {e}")), 0.0);
            }
        };

        let cost = calculate_cost(&self.judge_model, &response.usage);
        if let Err(e) = self
            .ledger
            .record_spend(cost, &format!("judge:{}", session.id))
        {
            tracing::warn!(session_id = %session.id, error = %e, "judge spend not recorded");
        }

        match parser::parse_scorecard(&response.content) {
            Some(raw) => (normalize::normalize_scorecard(raw), cost),
            None => {
                tracing::warn!(session_id = %session.id, "judge reply had no parseable scorecard");
                (Scorecard::failure("judge reply had no parseable scorecard"), cost)
            }
        }
    }
}

fn build_scoring_prompt(turns: &[Turn]) -> String {
    format!(
        "Score the AGENT side of this simulated closing call. The AGENT works \
         from a fixed playbook; the PROSPECT is an adversarial homeowner.\n\n\
         ## Transcript\n\
         {transcript}\n\n\
         ## Rubric\n\
         Rate each dimension 0 to 10:\n\
         - objection_handling: did the AGENT acknowledge, reframe, and move past pushback?\n\
         - math_defense: did the AGENT keep the savings math correct and defend it under challenge?\n\
         - closing_drive: did the AGENT ask for the close and convert momentum into commitment?\n\
         - humanity: did the AGENT sound like a person rather than a script reader?\n\n\
         Also report:\n\
         - contract_signed (boolean): did the PROSPECT clearly agree on this call to sign?\n\
         - price_variance (number): percent the final agreed price drifted below list; \
         0 or negative if the AGENT held or improved the price.\n\
         - rationale (string): one or two sentences on how the call was won or lost.\n\
         - winning_excerpt (string or null): the AGENT's single strongest line, quoted \
         verbatim from the transcript.\n\n\
         Reply with exactly one JSON object with keys: objection_handling, math_defense, \
         closing_drive, humanity, contract_signed, price_variance, rationale, winning_excerpt.",
        transcript = render_transcript(turns)
    )
}
