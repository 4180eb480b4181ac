//! In-memory market data gateway
//!
//! Serves recorded quotes, expiry lists and chains from memory or from a JSON
//! document. Used for offline runs and tests. Call counts are recorded per
//! operation and transient failures can be injected.

use crate::brokers::types::*;
use crate::brokers::MarketDataGateway;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Recorded market data for one ticker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerFixture {
    #[serde(default)]
    pub quote: Option<RawQuote>,
    #[serde(default)]
    pub expiry_dates: Vec<RawExpiryDate>,
    #[serde(default)]
    pub chains: BTreeMap<NaiveDate, Vec<OptionPair>>,
}

/// Fixture-backed gateway
#[derive(Debug, Default)]
pub struct FixtureGateway {
    tickers: HashMap<String, TickerFixture>,
    failing_tickers: HashSet<String>,
    calls: Mutex<HashMap<&'static str, usize>>,
    pending_failures: Mutex<HashMap<&'static str, u32>>,
}

impl FixtureGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from a JSON object keyed by ticker
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        let tickers: HashMap<String, TickerFixture> = serde_json::from_str(&text)?;

        Ok(Self {
            tickers: tickers
                .into_iter()
                .map(|(ticker, fixture)| (ticker.to_uppercase(), fixture))
                .collect(),
            ..Self::default()
        })
    }

    pub fn with_quote(mut self, ticker: &str, quote: RawQuote) -> Self {
        self.entry(ticker).quote = Some(quote);
        self
    }

    pub fn with_expiry_dates(mut self, ticker: &str, dates: Vec<RawExpiryDate>) -> Self {
        self.entry(ticker).expiry_dates = dates;
        self
    }

    pub fn with_chain(mut self, ticker: &str, expiry: NaiveDate, pairs: Vec<OptionPair>) -> Self {
        self.entry(ticker).chains.insert(expiry, pairs);
        self
    }

    /// Every call for `ticker` fails with a transient error
    pub fn with_failing_ticker(mut self, ticker: &str) -> Self {
        self.failing_tickers.insert(ticker.to_uppercase());
        self
    }

    /// The next `count` calls to `operation` fail with a transient error
    pub fn fail_next(&self, operation: &'static str, count: u32) {
        self.pending_failures.lock().insert(operation, count);
    }

    /// Calls made to `operation` so far, failed ones included
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.tickers.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    fn entry(&mut self, ticker: &str) -> &mut TickerFixture {
        self.tickers.entry(ticker.to_uppercase()).or_default()
    }

    fn begin(&self, operation: &'static str, ticker: &str) -> Result<&TickerFixture> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;

        {
            let mut pending = self.pending_failures.lock();
            if let Some(remaining) = pending.get_mut(operation) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AppError::TransientGateway(format!(
                        "{} {}: injected failure",
                        operation, ticker
                    )));
                }
            }
        }

        let key = ticker.to_uppercase();
        if self.failing_tickers.contains(&key) {
            return Err(AppError::TransientGateway(format!(
                "{} {}: service unavailable",
                operation, ticker
            )));
        }

        self.tickers
            .get(&key)
            .ok_or_else(|| AppError::Gateway(format!("Unknown ticker {}", ticker)))
    }
}

#[async_trait]
impl MarketDataGateway for FixtureGateway {
    fn id(&self) -> &'static str {
        "fixture"
    }

    async fn get_quote(&self, ticker: &str) -> Result<RawQuote> {
        self.begin("get_quote", ticker)?
            .quote
            .clone()
            .ok_or_else(|| AppError::Gateway(format!("No quote data for {}", ticker)))
    }

    async fn get_expiry_dates(&self, ticker: &str) -> Result<Vec<RawExpiryDate>> {
        Ok(self.begin("get_expiry_dates", ticker)?.expiry_dates.clone())
    }

    async fn get_option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<Vec<OptionPair>> {
        Ok(self
            .begin("get_option_chain", ticker)?
            .chains
            .get(&expiry)
            .cloned()
            .unwrap_or_default())
    }
}
