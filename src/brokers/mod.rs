//! Market data gateway adapters

pub mod types;
pub mod etrade;
pub mod fixture;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use types::*;

/// Market data gateway trait that all quote sources must implement
///
/// Each call is a single point-in-time request. Retries are applied by the
/// services at the call site, not here.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Gateway ID (e.g., "etrade", "fixture")
    fn id(&self) -> &'static str;

    /// Get the quote detail block for a ticker
    async fn get_quote(&self, ticker: &str) -> Result<RawQuote>;

    /// Get the option expiry dates for a ticker, in gateway order
    async fn get_expiry_dates(&self, ticker: &str) -> Result<Vec<RawExpiryDate>>;

    /// Get the option chain for a ticker and expiry date
    async fn get_option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<Vec<OptionPair>>;
}

/// Consumer key pair plus the access token pair produced by the OAuth handshake
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_secret: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !(self.consumer_key.is_empty()
            || self.consumer_secret.is_empty()
            || self.oauth_token.is_empty()
            || self.oauth_secret.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("oauth_token", &"<redacted>")
            .field("oauth_secret", &"<redacted>")
            .finish()
    }
}
