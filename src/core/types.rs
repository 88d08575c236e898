// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::TokenUsage;

/// Which side of the table is speaking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Scripted,
    CounterAgent,
}

impl Role {
    pub fn flip(self) -> Role {
        match self {
            Role::Scripted => Role::CounterAgent,
            Role::CounterAgent => Role::Scripted,
        }
    }

    /// Speaker tag used in transcripts and stored turns.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Scripted => "AGENT",
            Role::CounterAgent => "PROSPECT",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "AGENT" => Some(Role::Scripted),
            "PROSPECT" => Some(Role::CounterAgent),
            _ => None,
        }
    }
}

/// One utterance in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Role,
    pub text: String,
}

impl Turn {
    pub fn new(speaker: Role, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Running,
    Completed,
    AbortedBudget,
    AbortedError,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::AbortedBudget => "aborted_budget",
            SessionStatus::AbortedError => "aborted_error",
        }
    }

    pub fn parse(s: &str) -> Option<SessionStatus> {
        match s {
            "not_started" => Some(SessionStatus::NotStarted),
            "running" => Some(SessionStatus::Running),
            "completed" => Some(SessionStatus::Completed),
            "aborted_budget" => Some(SessionStatus::AbortedBudget),
            "aborted_error" => Some(SessionStatus::AbortedError),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::NotStarted | SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post-normalization sub-scores, each in 0..=10. Four equally-weighted
/// quarters of the composite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SubScores {
    pub objection_handling: f64,
    pub math_defense: f64,
    pub closing_drive: f64,
    pub humanity: f64,
}

impl SubScores {
    pub fn zero() -> Self {
        Self {
            objection_handling: 0.0,
            math_defense: 0.0,
            closing_drive: 0.0,
            humanity: 0.0,
        }
    }
}

/// Fully-populated scoring result. Every field is validated and defaulted by
/// the normalization pass; nothing downstream re-checks for missing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorecard {
    pub sub_scores: SubScores,
    /// Weighted sum plus adjustments, clamped to [0, 100].
    pub composite: f64,
    pub contract_signed: bool,
    /// How far the final agreed price drifted below list. Non-positive means
    /// the scripted side held or improved price.
    pub price_variance: f64,
    pub rationale: String,
    pub winning_excerpt: Option<String>,
    /// True when the judge call failed and this is the zero card.
    pub scoring_failed: bool,
}

impl Scorecard {
    /// Zero card returned when the judge call fails or its output is
    /// unparsable. A scoring failure never aborts an already-completed
    /// session.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            sub_scores: SubScores::zero(),
            composite: 0.0,
            contract_signed: false,
            price_variance: 0.0,
            rationale: reason.into(),
            winning_excerpt: None,
            scoring_failed: true,
        }
    }
}

/// One simulated dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub profile_id: String,
    pub sweep_id: Option<String>,
    pub turns: Vec<Turn>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub status: SessionStatus,
    /// Set once, at terminal state. Aborted sessions never get one.
    pub scorecard: Option<Scorecard>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(profile_id: impl Into<String>, sweep_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            sweep_id,
            turns: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            status: SessionStatus::NotStarted,
            scorecard: None,
            created_at: Utc::now(),
        }
    }

    pub fn push_turn(&mut self, speaker: Role, text: impl Into<String>) {
        self.turns.push(Turn::new(speaker, text));
    }

    /// Accumulate one call's usage and cost. Cost only ever goes up.
    pub fn record_usage(&mut self, usage: &TokenUsage, cost: f64) {
        self.input_tokens += usage.input_tokens as u64;
        self.output_tokens += usage.output_tokens as u64;
        self.cost_usd += cost.max(0.0);
    }

    pub fn last_turn_of(&self, speaker: Role) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.speaker == speaker)
    }

    pub fn composite(&self) -> Option<f64> {
        self.scorecard.as_ref().map(|s| s.composite)
    }
}

/// A named parameter set substituted for the counter-agent role. Owned by the
/// content layer; the orchestrator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterProfile {
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub dials: ProfileDials,
    pub created_at: DateTime<Utc>,
}

impl CounterProfile {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>, dials: ProfileDials) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            instructions: instructions.into(),
            dials,
            created_at: Utc::now(),
        }
    }
}

/// Behavioral dials rendered into the counter-agent's system instruction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileDials {
    pub hostility: u8,
    pub patience: u8,
    pub price_sensitivity: u8,
}

impl Default for ProfileDials {
    fn default() -> Self {
        Self {
            hostility: 5,
            patience: 5,
            price_sensitivity: 5,
        }
    }
}

impl ProfileDials {
    pub fn render(&self) -> String {
        format!(
            "hostility {}/10, patience {}/10, price sensitivity {}/10",
            self.hostility, self.patience, self.price_sensitivity
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SweepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SweepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStatus::Pending => "pending",
            SweepStatus::Running => "running",
            SweepStatus::Completed => "completed",
            SweepStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<SweepStatus> {
        match s {
            "pending" => Some(SweepStatus::Pending),
            "running" => Some(SweepStatus::Running),
            "completed" => Some(SweepStatus::Completed),
            "failed" => Some(SweepStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SweepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sweep invocation. `completed` counts settled units (null slots
/// included) and only ever advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRecord {
    pub id: String,
    pub target_total: u32,
    pub batch_size: u32,
    pub completed: u32,
    pub status: SweepStatus,
    pub halt_reason: Option<String>,
    pub ranked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SweepRecord {
    pub fn new(target_total: u32, batch_size: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_total,
            batch_size,
            completed: 0,
            status: SweepStatus::Pending,
            halt_reason: None,
            ranked_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Why a sweep stopped launching early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    BudgetExceeded,
    BreakerTripped,
    Fatal(String),
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::BudgetExceeded => write!(f, "budget exceeded"),
            HaltReason::BreakerTripped => write!(f, "breaker tripped"),
            HaltReason::Fatal(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

/// User-visible summary returned from every sweep, partial or not.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub attempted: u32,
    pub completed: u32,
    pub failed: u32,
    pub total_cost_usd: f64,
    pub halt: Option<HaltReason>,
}

/// One ranked entry from the selection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedWin {
    pub id: String,
    pub sweep_id: String,
    pub session_id: String,
    pub rank: u32,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

impl RankedWin {
    pub fn new(
        sweep_id: impl Into<String>,
        session_id: impl Into<String>,
        rank: u32,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sweep_id: sweep_id.into(),
            session_id: session_id.into(),
            rank,
            rationale: rationale.into(),
            created_at: Utc::now(),
        }
    }
}
