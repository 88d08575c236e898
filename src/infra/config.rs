// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Hard daily spend cap across all sessions and judge calls, in USD.
    pub daily_cap_usd: f64,
    /// Throttle warning fires when the remaining fraction of the daily cap
    /// drops below this ratio.
    pub throttle_remaining_ratio: f64,
    /// Per-session kill threshold, in USD. Catches runaway loops, not normal
    /// variance; a healthy session never approaches it.
    pub session_kill_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_cap_usd: 15.0,
            throttle_remaining_ratio: 0.10,
            session_kill_usd: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total turns per session, both speakers counted.
    pub turn_cap: u32,
    pub reply_max_tokens: u32,
    pub temperature: f32,
    pub scripted_model: String,
    pub counter_model: String,
    pub judge_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_cap: 12,
            reply_max_tokens: 300,
            temperature: 0.8,
            scripted_model: "gpt-4.1-mini".into(),
            counter_model: "gpt-4.1-mini".into(),
            judge_model: "gpt-4.1".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Sessions launched concurrently per group. Groups run sequentially.
    pub batch_size: u32,
    /// Pause between groups to avoid bursty load on the backend.
    pub inter_group_delay_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            inter_group_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_k: u32,
    pub min_composite: f64,
    pub min_math_defense: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_composite: 70.0,
            min_math_defense: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Remote kill-switch endpoint returning {"active": bool}. Optional; the
    /// local flag always works without it.
    pub status_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            status_url: None,
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert!((c.budget.daily_cap_usd - 15.0).abs() < 0.001);
        assert!((c.budget.throttle_remaining_ratio - 0.10).abs() < 0.001);
        assert!((c.budget.session_kill_usd - 1.0).abs() < 0.001);
        assert_eq!(c.session.turn_cap, 12);
        assert_eq!(c.sweep.batch_size, 10);
        assert_eq!(c.ranking.top_k, 3);
    }

    #[test]
    fn test_breaker_defaults() {
        let b = BreakerConfig::default();
        assert!(b.status_url.is_none());
        assert_eq!(b.timeout_ms, 3000);
    }

    #[test]
    fn test_session_default_models() {
        let s = SessionConfig::default();
        assert_eq!(s.scripted_model, "gpt-4.1-mini");
        assert_eq!(s.judge_model, "gpt-4.1");
        assert_eq!(s.reply_max_tokens, 300);
    }

    #[test]
    fn test_ranking_defaults() {
        let r = RankingConfig::default();
        assert!((r.min_composite - 70.0).abs() < 0.001);
        assert!((r.min_math_defense - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = "";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.turn_cap, 12);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[provider]
base_url = "http://localhost:8080/v1"
api_key_env = "LOCAL_KEY"

[budget]
daily_cap_usd = 40.0
throttle_remaining_ratio = 0.2
session_kill_usd = 2.5

[session]
turn_cap = 16
reply_max_tokens = 400
temperature = 0.5
scripted_model = "gpt-4.1"
counter_model = "gpt-4.1-mini"
judge_model = "o4-mini"

[sweep]
batch_size = 5
inter_group_delay_ms = 500

[ranking]
top_k = 5
min_composite = 80.0
min_math_defense = 7.0

[breaker]
status_url = "https://ops.example.com/kill"
timeout_ms = 1000

[notify]
webhook_url = "https://hooks.example.com/scrimmage"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert!((config.budget.daily_cap_usd - 40.0).abs() < 0.001);
        assert_eq!(config.session.turn_cap, 16);
        assert_eq!(config.session.judge_model, "o4-mini");
        assert_eq!(config.sweep.batch_size, 5);
        assert_eq!(config.ranking.top_k, 5);
        assert_eq!(
            config.breaker.status_url.as_deref(),
            Some("https://ops.example.com/kill")
        );
        assert_eq!(config.breaker.timeout_ms, 1000);
        assert!(config.notify.webhook_url.is_some());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.session.turn_cap, config.session.turn_cap);
        assert!((deserialized.budget.daily_cap_usd - config.budget.daily_cap_usd).abs() < 0.001);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sweep]\nbatch_size = 3\ninter_group_delay_ms = 0\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.sweep.batch_size, 3);
        assert_eq!(config.sweep.inter_group_delay_ms, 0);
    }
}
