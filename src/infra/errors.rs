// src/infra/errors.rs — Error types for scrimmage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrimmageError {
    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Budget errors (not retriable)
    #[error("Session {session_id} hit its kill threshold: ${spent:.2}/${limit:.2}")]
    SessionBudget {
        session_id: String,
        spent: f64,
        limit: f64,
    },

    #[error("Daily budget exhausted: ${spent:.2}/${cap:.2}")]
    DailyBudgetExceeded { spent: f64, cap: f64 },

    #[error("Circuit breaker is tripped")]
    BreakerTripped,

    // User errors
    #[error("No provider configured. Set {env_var} or fill in [provider] in config.toml.")]
    NoProvider { env_var: String },

    #[error("Counter profile '{id}' not found")]
    ProfileNotFound { id: String },

    #[error("Sweep '{id}' not found")]
    SweepNotFound { id: String },

    #[error("Sweep '{id}' is not rankable (status: {status})")]
    SweepNotRankable { id: String, status: String },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrimmageError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ScrimmageError::Provider {
                retriable: true,
                ..
            } | ScrimmageError::RateLimited { .. }
        )
    }

    /// Budget-class failures halt a sweep; anything else only loses its slot.
    pub fn is_budget(&self) -> bool {
        matches!(
            self,
            ScrimmageError::SessionBudget { .. } | ScrimmageError::DailyBudgetExceeded { .. }
        )
    }
}
