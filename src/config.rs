//! Runtime settings
//!
//! Settings come from an optional JSON file; credentials and the target
//! environment can be overridden from the process environment so secrets
//! never need to live in the file.

use crate::brokers::Credentials;
use crate::error::{AppError, Result};
use crate::models::OptionsQuery;
use crate::services::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Market API environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Live,
    Sandbox,
}

/// What to do with a contract whose expiry is today or already past
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateExpiryPolicy {
    /// Keep the contract with a zero annualization factor
    #[default]
    ZeroYield,
    /// Drop the contract before filtering
    Reject,
}

/// Retry budget for each gateway call site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Multi-ticker batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Concurrent per-ticker pipelines
    pub workers: usize,
    /// Tickers trading above this percentile of their 52-week range are skipped
    pub max_range_position_pct: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_range_position_pct: 50.0,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,
    pub http_timeout_secs: u64,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub degenerate_expiry: DegenerateExpiryPolicy,
    pub defaults: OptionsQuery,
    pub credentials: Option<Credentials>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Live,
            http_timeout_secs: 30,
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            degenerate_expiry: DegenerateExpiryPolicy::ZeroYield,
            defaults: OptionsQuery::default(),
            credentials: None,
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&text).map_err(|e| {
                    AppError::Config(format!("Invalid settings file {}: {}", path.display(), e))
                })?
            }
            None => Settings::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;

        Ok(settings)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup("ETRADE_SANDBOX") {
            if matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                self.environment = Environment::Sandbox;
            }
        }

        let mut credentials = self.credentials.clone().unwrap_or(Credentials {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            oauth_token: String::new(),
            oauth_secret: String::new(),
        });

        let mut touched = false;
        for (key, slot) in [
            ("ETRADE_CONSUMER_KEY", &mut credentials.consumer_key),
            ("ETRADE_CONSUMER_SECRET", &mut credentials.consumer_secret),
            ("ETRADE_OAUTH_TOKEN", &mut credentials.oauth_token),
            ("ETRADE_OAUTH_SECRET", &mut credentials.oauth_secret),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
                touched = true;
            }
        }

        if touched {
            self.credentials = Some(credentials);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch.workers == 0 {
            return Err(AppError::Config("batch.workers must be at least 1".to_string()));
        }
        if !self.batch.max_range_position_pct.is_finite() {
            return Err(AppError::Config(
                "batch.max_range_position_pct must be a finite number".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("http_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
