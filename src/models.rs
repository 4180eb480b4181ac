//! Pipeline data model

use crate::brokers::types::ExpiryCadence;
use crate::error::{AppError, Result};
use crate::services::strike_window;
use chrono::NaiveDate;
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

/// Current calendar date on the exchange clock (US Eastern)
pub fn market_today() -> NaiveDate {
    chrono::Utc::now().with_timezone(&New_York).date_naive()
}

/// Point-in-time market data for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Mid-price, average of bid and ask
    pub market_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub high_52: Option<f64>,
    pub low_52: Option<f64>,
    pub beta: Option<f64>,
    pub next_earnings_date: Option<String>,
    pub company_name: Option<String>,
}

impl MarketSnapshot {
    /// Position of the market price inside the 52-week range, in percent.
    /// `None` when the range is unknown, empty or inverted.
    pub fn range_position_pct(&self) -> Option<f64> {
        let (high, low) = (self.high_52?, self.low_52?);
        let range = high - low;
        if range <= 0.0 || !range.is_finite() {
            return None;
        }
        Some((self.market_price - low) / range * 100.0)
    }
}

/// An option expiry date with its cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpiryDate {
    pub date: NaiveDate,
    pub cadence: ExpiryCadence,
}

impl ExpiryDate {
    pub fn monthly(date: NaiveDate) -> Self {
        Self {
            date,
            cadence: ExpiryCadence::Monthly,
        }
    }

    /// Calendar days from `today` until expiry (negative once expired)
    pub fn days_from(&self, today: NaiveDate) -> i64 {
        (self.date - today).num_days()
    }
}

/// Derived per-contract metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxiliaryInfo {
    pub contracts_to_buy: i64,
    pub revenue: f64,
    pub annualized_revenue: i64,
    /// Percent units
    pub annualized_return: f64,
    pub notional_principle: f64,
}

/// A put contract moving through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub bid: f64,
    pub ask: f64,
    pub last_price: f64,
    pub volume: i64,
    pub open_interest: i64,
    pub strike_price: f64,
    pub symbol: String,
    pub option_type: String,
    pub net_change: f64,
    #[serde(rename = "OptionGreeks", default, skip_serializing_if = "Option::is_none")]
    pub option_greeks: Option<serde_json::Value>,
    pub expiry_date: ExpiryDate,
    pub market_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below_market_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_info: Option<AuxiliaryInfo>,
}

impl Contract {
    pub fn annualized_return(&self) -> Option<f64> {
        self.auxiliary_info.as_ref().map(|aux| aux.annualized_return)
    }
}

/// User-supplied screening criteria for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsQuery {
    pub ticker: String,
    /// Farther bound, percent below market
    pub min_strike_pct: f64,
    /// Nearer bound, percent below market
    pub max_strike_pct: f64,
    pub increment: f64,
    pub month_look_ahead: u32,
    pub include_nearest: bool,
    pub min_volume: i64,
    pub min_open_interest: i64,
    pub min_annualized_return: f64,
    /// Cap on contracts per position; `None` or `0` means take the full volume
    pub contracts_to_buy: Option<u32>,
}

impl Default for OptionsQuery {
    fn default() -> Self {
        Self {
            ticker: "GOOG".to_string(),
            min_strike_pct: 30.0,
            max_strike_pct: 20.0,
            increment: 100.0,
            month_look_ahead: 3,
            include_nearest: true,
            min_volume: 1,
            min_open_interest: 1,
            min_annualized_return: 0.0,
            contracts_to_buy: Some(1),
        }
    }
}

impl OptionsQuery {
    /// Reject bad criteria before any network call
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(AppError::InvalidParameter("ticker must not be empty".to_string()));
        }
        strike_window::validate(self.min_strike_pct, self.max_strike_pct, self.increment)?;
        if self.month_look_ahead == 0 {
            return Err(AppError::InvalidParameter(
                "month_look_ahead must be at least 1".to_string(),
            ));
        }
        if self.min_annualized_return.is_nan() {
            return Err(AppError::InvalidParameter(
                "min_annualized_return must be a number".to_string(),
            ));
        }
        Ok(())
    }

    /// Same criteria for another ticker
    pub fn for_ticker(&self, ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..self.clone()
        }
    }
}
