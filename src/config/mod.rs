//! Configuration management
//!
//! Defaults cover a local deployment; a TOML file and `DIALCAST_*`
//! environment variables override them.

use crate::application::campaign::SuccessCriteriaConfig;
use crate::application::scheduler::SchedulerConfig;
use crate::domain::call::policy::{ExponentialBackoffRetry, FixedIntervalRetry, RetryPolicy};
use crate::domain::call::value_object::CallOutcome;
use crate::domain::campaign::analytics::SuccessCriteria;
use crate::domain::shared::value_objects::BusinessId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub scheduler: SchedulerSettings,
    pub session: SessionSettings,
    /// Success-outcome overrides: key is a business id or "default",
    /// value is a list of outcome codes
    pub success_outcomes: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost/dialcast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub mode: RetryMode,
    pub multiplier: f64,
    pub max_delay_minutes: u32,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            mode: RetryMode::Fixed,
            multiplier: 2.0,
            max_delay_minutes: 24 * 60,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub poll_interval_secs: u64,
    pub workers: usize,
    pub priority_threshold: u8,
    pub default_concurrency_limit: u32,
    pub utc_offset_minutes: i32,
    pub max_dials_per_pass: usize,
    pub retry: RetrySettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            workers: 2,
            priority_threshold: 1,
            default_concurrency_limit: 3,
            utc_offset_minutes: 0,
            max_dials_per_pass: 10,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub sweep_interval_secs: u64,
    pub follow_up_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            follow_up_interval_secs: 300,
        }
    }
}

impl Config {
    /// Load from an optional TOML file plus `DIALCAST_*` env overrides
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix("DIALCAST").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.scheduler.poll_interval_secs),
            worker_count: self.scheduler.workers.max(1),
            priority_threshold: self.scheduler.priority_threshold,
            default_concurrency_limit: self.scheduler.default_concurrency_limit,
            concurrency_overrides: HashMap::new(),
            utc_offset_minutes: self.scheduler.utc_offset_minutes,
            max_dials_per_pass: self.scheduler.max_dials_per_pass,
        }
    }

    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        match self.scheduler.retry.mode {
            RetryMode::Fixed => Arc::new(FixedIntervalRetry),
            RetryMode::Exponential => Arc::new(ExponentialBackoffRetry {
                multiplier: self.scheduler.retry.multiplier,
                max_delay_minutes: self.scheduler.retry.max_delay_minutes,
                jitter: self.scheduler.retry.jitter,
            }),
        }
    }

    /// Resolve the success-outcome taxonomy from configuration
    ///
    /// Unknown outcome codes and unparseable business ids are skipped
    /// with a warning rather than failing startup.
    pub fn success_criteria(&self) -> SuccessCriteriaConfig {
        let parse_outcomes = |codes: &[String]| -> Vec<CallOutcome> {
            codes
                .iter()
                .filter_map(|code| {
                    let parsed = CallOutcome::parse(code);
                    if parsed.is_none() {
                        warn!(code = code.as_str(), "unknown success outcome code in config");
                    }
                    parsed
                })
                .collect()
        };

        let default = self
            .success_outcomes
            .get("default")
            .map(|codes| SuccessCriteria::new(parse_outcomes(codes)))
            .unwrap_or_default();

        let mut criteria = SuccessCriteriaConfig::new(default);
        for (key, codes) in &self.success_outcomes {
            if key == "default" {
                continue;
            }
            match key.parse::<Uuid>() {
                Ok(uuid) => {
                    criteria = criteria.with_override(
                        BusinessId::from_uuid(uuid),
                        SuccessCriteria::new(parse_outcomes(codes)),
                    );
                }
                Err(_) => warn!(key = key.as_str(), "success_outcomes key is not a business id"),
            }
        }
        criteria
    }
}
