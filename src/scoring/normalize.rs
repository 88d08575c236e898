// src/scoring/normalize.rs — Deterministic post-processing of raw judge output

use crate::core::types::{Scorecard, SubScores};

use super::parser::RawScorecard;

/// Weight of each sub-score quarter. Four quarters of 0..=10 give a composite
/// band of 0..=100 before adjustments.
pub const SUB_WEIGHT: f64 = 2.5;

/// Midpoint substituted when the judge omits a sub-score.
pub const NEUTRAL_SUB: f64 = 5.0;

/// Flat bonus for a signed contract with no downward price drift.
pub const HELD_PRICE_BONUS: f64 = 8.0;

/// Clamp a raw sub-score into its declared 0..=10 band. Raw judge output is
/// never trusted unclamped.
pub fn clamp_sub(raw: f64) -> f64 {
    raw.clamp(0.0, 10.0)
}

/// Default a missing sub-score to the neutral midpoint, then clamp.
pub fn normalize_sub(raw: Option<f64>) -> f64 {
    clamp_sub(raw.unwrap_or(NEUTRAL_SUB))
}

/// Tiered penalty for giving ground on price. Zero when the scripted side
/// held or improved.
pub fn discount_penalty(price_variance: f64) -> f64 {
    if price_variance <= 0.0 {
        0.0
    } else if price_variance <= 5.0 {
        4.0
    } else if price_variance <= 15.0 {
        8.0
    } else {
        12.0
    }
}

/// Weighted sum of clamped sub-scores plus outcome adjustments, clamped to
/// [0, 100]. Adjustments can push the raw sum out of range and the final
/// clamp corrects that.
pub fn composite_score(subs: &SubScores, contract_signed: bool, price_variance: f64) -> f64 {
    let weighted = (subs.objection_handling + subs.math_defense + subs.closing_drive + subs.humanity)
        * SUB_WEIGHT;

    let mut score = weighted;
    if contract_signed && price_variance <= 0.0 {
        score += HELD_PRICE_BONUS;
    }
    score -= discount_penalty(price_variance);

    score.clamp(0.0, 100.0)
}

/// Turn a raw judge scorecard into the fully-validated form. Every field is
/// clamped or defaulted here; nothing downstream re-checks.
pub fn normalize_scorecard(raw: RawScorecard) -> Scorecard {
    let sub_scores = SubScores {
        objection_handling: normalize_sub(raw.objection_handling),
        math_defense: normalize_sub(raw.math_defense),
        closing_drive: normalize_sub(raw.closing_drive),
        humanity: normalize_sub(raw.humanity),
    };
    let contract_signed = raw.contract_signed.unwrap_or(false);
    let price_variance = raw.price_variance.unwrap_or(0.0);

    Scorecard {
        composite: composite_score(&sub_scores, contract_signed, price_variance),
        sub_scores,
        contract_signed,
        price_variance,
        rationale: raw.rationale.unwrap_or_default(),
        winning_excerpt: raw
            .winning_excerpt
            .filter(|e| !e.trim().is_empty()),
        scoring_failed: false,
    }
}
