// src/scoring/parser.rs — Parse judge responses into raw scorecards

use serde::Deserialize;

/// Scorecard exactly as the judge emits it, before clamping and defaulting.
///
/// Every field is optional. Judges drop keys under pressure, and the
/// normalization pass substitutes documented defaults instead of failing
/// the session over a missing number.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawScorecard {
    pub objection_handling: Option<f64>,
    pub math_defense: Option<f64>,
    pub closing_drive: Option<f64>,
    pub humanity: Option<f64>,
    pub contract_signed: Option<bool>,
    pub price_variance: Option<f64>,
    pub rationale: Option<String>,
    pub winning_excerpt: Option<String>,
}

/// One entry of the ranking judge's reply, before validation. Unknown
/// session ids and missing ranks are the caller's problem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRankedPick {
    pub session_id: Option<String>,
    pub rank: Option<u32>,
    pub rationale: Option<String>,
}

/// Parse a judge response into a raw scorecard.
///
/// Tries the whole response as JSON first, then retries on the outermost
/// brace-delimited slice, since models wrap JSON in prose or code fences.
/// Returns `None` when no parseable object is found.
pub fn parse_scorecard(response: &str) -> Option<RawScorecard> {
    let trimmed = response.trim();
    if let Ok(card) = serde_json::from_str::<RawScorecard>(trimmed) {
        return Some(card);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<RawScorecard>(&trimmed[start..=end]).ok()
}

/// Parse a ranking response into raw picks, with the same whole-then-slice
/// strategy as `parse_scorecard` but over the outermost bracket pair.
pub fn parse_ranking(response: &str) -> Option<Vec<RawRankedPick>> {
    let trimmed = response.trim();
    if let Ok(picks) = serde_json::from_str::<Vec<RawRankedPick>>(trimmed) {
        return Some(picks);
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<RawRankedPick>>(&trimmed[start..=end]).ok()
}
