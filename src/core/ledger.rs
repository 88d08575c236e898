// src/core/ledger.rs — Append-only spend ledger with derived daily budget state

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::Utc;

use crate::infra::errors::ScrimmageError;
use crate::store::Store;

/// Derived view over today's entries. Recomputed on every call; staleness is
/// bounded by one admission check, never by a cache.
#[derive(Debug, Clone)]
pub struct BudgetState {
    pub daily_cap_usd: f64,
    pub spent_today_usd: f64,
    pub remaining_usd: f64,
    pub is_throttled: bool,
    pub is_exceeded: bool,
}

/// Records every unit of spend and answers "how much today" and
/// "are we throttled/blocked". Shared across concurrent sessions; all
/// mutation is a single append, so writers never coordinate.
#[derive(Clone)]
pub struct CostLedger {
    store: Arc<Mutex<Store>>,
    daily_cap_usd: f64,
    throttle_remaining_ratio: f64,
}

impl CostLedger {
    pub fn new(store: Arc<Mutex<Store>>, daily_cap_usd: f64, throttle_remaining_ratio: f64) -> Self {
        Self {
            store,
            daily_cap_usd,
            throttle_remaining_ratio,
        }
    }

    /// Append one spend record attributed to a session or scoring call.
    /// Storage failure is surfaced, never swallowed.
    pub fn record_spend(&self, amount_usd: f64, attribution: &str) -> Result<(), ScrimmageError> {
        let id = uuid::Uuid::new_v4().to_string();
        let day = today_utc();

        let store = self
            .store
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        store.insert_ledger_entry(&id, amount_usd, attribution, &day)?;

        tracing::debug!(amount_usd, attribution, "ledger append");
        Ok(())
    }

    /// Fold today's entries against the configured cap.
    pub fn budget_state(&self) -> Result<BudgetState, ScrimmageError> {
        let day = today_utc();

        let spent = {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            store.ledger_day_total(&day)?
        };

        let remaining = (self.daily_cap_usd - spent).max(0.0);
        let remaining_fraction = if self.daily_cap_usd > 0.0 {
            remaining / self.daily_cap_usd
        } else {
            0.0
        };

        Ok(BudgetState {
            daily_cap_usd: self.daily_cap_usd,
            spent_today_usd: spent,
            remaining_usd: remaining,
            is_throttled: remaining_fraction < self.throttle_remaining_ratio,
            is_exceeded: spent >= self.daily_cap_usd,
        })
    }

    pub fn daily_cap_usd(&self) -> f64 {
        self.daily_cap_usd
    }
}

/// UTC day bucket for ledger entries, e.g. "2026-08-25".
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
