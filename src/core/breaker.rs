// src/core/breaker.rs — Dual-source kill switch
//
// Two signal sources, consulted in order, short-circuiting on the first
// positive: a process-local flag (always available, fail closed) and a remote
// status endpoint (short timeout, fail open). Tripping never aborts in-flight
// work; it only stops new work from launching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;

use crate::infra::config::BreakerConfig;

pub struct CircuitBreaker {
    local: AtomicBool,
    status_url: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RemoteStatus {
    active: bool,
}

impl CircuitBreaker {
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            local: AtomicBool::new(false),
            status_url: config.status_url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    /// Set the local flag. Subsequent checks short-circuit without touching
    /// the network or the ledger.
    pub fn trip(&self, reason: &str) {
        if !self.local.swap(true, Ordering::SeqCst) {
            tracing::warn!(reason, "circuit breaker tripped");
        }
    }

    pub fn local_tripped(&self) -> bool {
        self.local.load(Ordering::SeqCst)
    }

    /// Consult local flag, then the remote endpoint. A remote failure or
    /// timeout is treated as not tripped; a flaky monitoring endpoint must
    /// never halt a healthy run.
    pub async fn is_tripped(&self) -> bool {
        if self.local_tripped() {
            return true;
        }

        match self.remote_active().await {
            Some(true) => {
                tracing::warn!("remote kill switch is active");
                true
            }
            Some(false) | None => false,
        }
    }

    async fn remote_active(&self) -> Option<bool> {
        let url = self.status_url.as_ref()?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "breaker status check failed");
            return None;
        }

        let status: RemoteStatus = response.json().await.ok()?;
        Some(status.active)
    }
}
