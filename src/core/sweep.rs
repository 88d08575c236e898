// src/core/sweep.rs — Batched sweep coordinator
//
// A sweep is groups of concurrent sessions run back to back. Groups are
// sequential; sessions inside a group all launch together and every one is
// awaited before the next group starts. A failed unit costs exactly its own
// slot. Budget exhaustion and a tripped breaker stop the sweep at the next
// group boundary, never mid-group.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use futures::future::join_all;

use crate::core::breaker::CircuitBreaker;
use crate::core::ledger::CostLedger;
use crate::core::session::SessionOrchestrator;
use crate::core::types::{
    CounterProfile, HaltReason, Session, SweepRecord, SweepReport, SweepStatus,
};
use crate::infra::config::SweepConfig;
use crate::infra::errors::ScrimmageError;
use crate::notify::{Notifier, NotifyEvent};
use crate::store::Store;

/// Everything a finished or halted sweep hands back: the persisted record,
/// per-slot results with `None` where a unit failed, and the summary report.
#[derive(Debug)]
pub struct SweepOutcome {
    pub record: SweepRecord,
    pub results: Vec<Option<Session>>,
    pub report: SweepReport,
}

pub struct SweepCoordinator {
    sessions: SessionOrchestrator,
    ledger: CostLedger,
    breaker: Arc<CircuitBreaker>,
    store: Arc<Mutex<Store>>,
    notifier: Arc<dyn Notifier>,
    config: SweepConfig,
}

impl SweepCoordinator {
    pub fn new(
        sessions: SessionOrchestrator,
        ledger: CostLedger,
        breaker: Arc<CircuitBreaker>,
        store: Arc<Mutex<Store>>,
        notifier: Arc<dyn Notifier>,
        config: SweepConfig,
    ) -> Self {
        Self {
            sessions,
            ledger,
            breaker,
            store,
            notifier,
            config,
        }
    }

    /// Run `target_total` sessions in groups, rotating through the given
    /// profiles. Returns partial results on early halt; only a top-level
    /// failure (storage gone) propagates as an error, and even then the
    /// sweep record is marked failed first.
    pub async fn run(
        &self,
        profiles: &[CounterProfile],
        target_total: u32,
    ) -> Result<SweepOutcome, ScrimmageError> {
        if profiles.is_empty() {
            return Err(ScrimmageError::Config(
                "sweep needs at least one counter profile".into(),
            ));
        }
        if target_total == 0 {
            return Err(ScrimmageError::Config("sweep target must be at least 1".into()));
        }

        let mut record = SweepRecord::new(target_total, self.config.batch_size.max(1));
        {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            store.insert_sweep(&record)?;
        }
        record.status = SweepStatus::Running;
        self.persist_status(&record.id, SweepStatus::Running, None)?;
        tracing::info!(
            sweep_id = %record.id,
            target_total,
            batch_size = record.batch_size,
            profiles = profiles.len(),
            "sweep start"
        );

        match self.drive(&mut record, profiles).await {
            Ok((results, halt)) => self.finalize(record, results, halt),
            Err(e) => {
                let reason = HaltReason::Fatal(e.to_string()).to_string();
                if let Err(pe) =
                    self.persist_status(&record.id, SweepStatus::Failed, Some(&reason))
                {
                    tracing::warn!(sweep_id = %record.id, error = %pe, "sweep failure not persisted");
                }
                self.notifier.notify(NotifyEvent::SweepFailed {
                    sweep_id: record.id.clone(),
                    reason,
                    completed: record.completed,
                });
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        record: &mut SweepRecord,
        profiles: &[CounterProfile],
    ) -> Result<(Vec<Option<Session>>, Option<HaltReason>), ScrimmageError> {
        let sweep_id = record.id.clone();
        let batch = record.batch_size as usize;
        let units: Vec<u32> = (0..record.target_total).collect();

        let mut results: Vec<Option<Session>> = Vec::with_capacity(units.len());
        let mut halt: Option<HaltReason> = None;
        let mut throttle_notified = false;

        for (group_no, group) in units.chunks(batch).enumerate() {
            if group_no > 0 && self.config.inter_group_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_group_delay_ms)).await;
            }

            if let Some(reason) = self.pre_group_check(&mut throttle_notified).await? {
                halt = Some(reason);
                break;
            }

            tracing::debug!(
                sweep_id = %sweep_id,
                group = group_no,
                size = group.len(),
                "group launch"
            );
            let group_futures = group.iter().map(|&unit| {
                let profile = &profiles[unit as usize % profiles.len()];
                let id = sweep_id.clone();
                async move { self.sessions.run(profile, Some(id)).await }
            });

            for outcome in join_all(group_futures).await {
                match outcome {
                    Ok(session) => results.push(Some(session)),
                    Err(e) => {
                        if e.is_budget() && halt.is_none() {
                            halt = Some(HaltReason::BudgetExceeded);
                        }
                        tracing::warn!(
                            sweep_id = %sweep_id,
                            error = %e,
                            "unit failed; slot recorded as null"
                        );
                        results.push(None);
                    }
                }
            }

            record.completed = results.len() as u32;
            {
                let store = self
                    .store
                    .lock()
                    .map_err(|_| anyhow!("store lock poisoned"))?;
                store.advance_sweep_progress(&sweep_id, record.completed)?;
            }

            if halt.is_some() {
                break;
            }
        }

        Ok((results, halt))
    }

    /// Gate run once per group: ledger first (exhaustion also trips the
    /// breaker), then the breaker itself. The throttle warning fires at most
    /// once per sweep and blocks nothing.
    async fn pre_group_check(
        &self,
        throttle_notified: &mut bool,
    ) -> Result<Option<HaltReason>, ScrimmageError> {
        let state = self.ledger.budget_state()?;
        if state.is_exceeded {
            self.breaker.trip("daily budget exhausted");
            return Ok(Some(HaltReason::BudgetExceeded));
        }
        if state.is_throttled && !*throttle_notified {
            *throttle_notified = true;
            tracing::warn!(
                spent_today_usd = state.spent_today_usd,
                daily_cap_usd = state.daily_cap_usd,
                "daily budget throttle crossed"
            );
            self.notifier.notify(NotifyEvent::BudgetThrottled {
                spent_today_usd: state.spent_today_usd,
                daily_cap_usd: state.daily_cap_usd,
                remaining_usd: state.remaining_usd,
            });
        }

        if self.breaker.is_tripped().await {
            return Ok(Some(HaltReason::BreakerTripped));
        }
        Ok(None)
    }

    fn finalize(
        &self,
        mut record: SweepRecord,
        results: Vec<Option<Session>>,
        halt: Option<HaltReason>,
    ) -> Result<SweepOutcome, ScrimmageError> {
        let (status, halt_str) = match &halt {
            Some(reason) => (SweepStatus::Failed, Some(reason.to_string())),
            None => (SweepStatus::Completed, None),
        };
        record.status = status;
        record.halt_reason = halt_str.clone();
        self.persist_status(&record.id, status, halt_str.as_deref())?;

        let completed = results.iter().filter(|r| r.is_some()).count() as u32;
        let attempted = results.len() as u32;
        let total_cost_usd = {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            store.sweep_cost(&record.id)?
        };
        let report = SweepReport {
            attempted,
            completed,
            failed: attempted - completed,
            total_cost_usd,
            halt,
        };

        match status {
            SweepStatus::Completed => self.notifier.notify(NotifyEvent::SweepCompleted {
                sweep_id: record.id.clone(),
                attempted: report.attempted,
                completed: report.completed,
                failed: report.failed,
                total_cost_usd: report.total_cost_usd,
            }),
            _ => self.notifier.notify(NotifyEvent::SweepFailed {
                sweep_id: record.id.clone(),
                reason: record.halt_reason.clone().unwrap_or_default(),
                completed: record.completed,
            }),
        }

        tracing::info!(
            sweep_id = %record.id,
            status = %record.status,
            attempted = report.attempted,
            completed = report.completed,
            failed = report.failed,
            total_cost_usd = report.total_cost_usd,
            "sweep finished"
        );
        Ok(SweepOutcome {
            record,
            results,
            report,
        })
    }

    fn persist_status(
        &self,
        id: &str,
        status: SweepStatus,
        halt_reason: Option<&str>,
    ) -> Result<(), ScrimmageError> {
        let store = self
            .store
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        store.update_sweep_status(id, status, halt_reason)?;
        Ok(())
    }
}
