// src/notify/mod.rs — Outbound notifications (webhook)
//
// Notifications are advisory. Delivery is fire-and-forget from a spawned
// task; a dead webhook endpoint must never slow down or fail a sweep.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::infra::config::NotifyConfig;

/// Events worth telling an external channel about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyEvent {
    SweepCompleted {
        sweep_id: String,
        attempted: u32,
        completed: u32,
        failed: u32,
        total_cost_usd: f64,
    },
    SweepFailed {
        sweep_id: String,
        reason: String,
        completed: u32,
    },
    /// Fired once per sweep when the remaining daily budget first drops
    /// below the throttle ratio.
    BudgetThrottled {
        spent_today_usd: f64,
        daily_cap_usd: f64,
        remaining_usd: f64,
    },
}

impl NotifyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotifyEvent::SweepCompleted { .. } => "sweep.completed",
            NotifyEvent::SweepFailed { .. } => "sweep.failed",
            NotifyEvent::BudgetThrottled { .. } => "budget.throttled",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotifyEvent);
}

/// POSTs each event as JSON to a configured URL. Failures are logged at
/// debug and dropped.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: NotifyEvent) {
        let url = self.url.clone();
        let client = self.client.clone();
        let payload = json!({
            "event": event.name(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "data": event,
        });

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, "notification delivered");
                }
                Ok(response) => {
                    tracing::debug!(url = %url, status = %response.status(), "notification rejected");
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "notification failed");
                }
            }
        });
    }
}

/// Used when no webhook is configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: NotifyEvent) {}
}

pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match &config.webhook_url {
        Some(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(url.clone())),
        _ => Arc::new(NoopNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = NotifyEvent::SweepCompleted {
            sweep_id: "sweep-1".into(),
            attempted: 10,
            completed: 8,
            failed: 2,
            total_cost_usd: 1.25,
        };
        assert_eq!(event.name(), "sweep.completed");
        assert_eq!(
            NotifyEvent::BudgetThrottled {
                spent_today_usd: 13.6,
                daily_cap_usd: 15.0,
                remaining_usd: 1.4,
            }
            .name(),
            "budget.throttled"
        );
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = NotifyEvent::SweepFailed {
            sweep_id: "sweep-2".into(),
            reason: "breaker tripped".into(),
            completed: 4,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "sweep_failed");
        assert_eq!(value["reason"], "breaker tripped");
        assert_eq!(value["completed"], 4);
    }

    #[test]
    fn test_from_config_noop_without_url() {
        // just checks it builds; a noop notify is observable only by absence
        let notifier = from_config(&NotifyConfig { webhook_url: None });
        notifier.notify(NotifyEvent::BudgetThrottled {
            spent_today_usd: 0.0,
            daily_cap_usd: 15.0,
            remaining_usd: 15.0,
        });
    }
}
