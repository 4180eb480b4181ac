//! Application state
//!
//! Everything a query needs, passed explicitly. The gateway carries its own
//! credentials; there is no process-wide auth state.

use crate::brokers::etrade::ETradeGateway;
use crate::brokers::MarketDataGateway;
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::services::retry::RetryPolicy;
use std::sync::Arc;

/// Application state shared across queries and batch workers
pub struct AppState {
    /// Market data gateway
    pub gateway: Arc<dyn MarketDataGateway>,

    /// Runtime settings
    pub settings: Settings,
}

impl AppState {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, settings: Settings) -> Self {
        Self { gateway, settings }
    }

    /// State backed by the E*Trade API using the configured credentials
    pub fn etrade(settings: Settings) -> Result<Self> {
        let credentials = settings.credentials.clone().ok_or_else(|| {
            AppError::Auth(
                "No E*Trade credentials configured (set ETRADE_CONSUMER_KEY, ETRADE_CONSUMER_SECRET, ETRADE_OAUTH_TOKEN, ETRADE_OAUTH_SECRET)"
                    .to_string(),
            )
        })?;

        let gateway = ETradeGateway::new(credentials, settings.environment, settings.http_timeout())?;
        tracing::info!("Using E*Trade gateway ({:?})", settings.environment);

        Ok(Self::new(Arc::new(gateway), settings))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.settings.retry.policy()
    }
}

/// Settings with millisecond retry delays
#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.retry.base_delay_ms = 1;
    settings.retry.max_delay_ms = 4;
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etrade_state_requires_credentials() {
        let result = AppState::etrade(Settings::default());
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let state = AppState::new(
            Arc::new(crate::brokers::fixture::FixtureGateway::new()),
            test_settings(),
        );
        let policy = state.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, std::time::Duration::from_millis(1));
    }
}
