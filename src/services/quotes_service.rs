//! Quotes Service
//!
//! Resolves the live market snapshot for a ticker. Every call goes to the
//! gateway; nothing is cached between queries.

use crate::brokers::types::{NumericField, RawQuote};
use crate::error::{AppError, Result};
use crate::models::MarketSnapshot;
use crate::services::retry::with_retry;
use crate::state::AppState;
use tracing::info;

/// Quotes service for business logic
pub struct QuotesService;

impl QuotesService {
    /// Get the market snapshot for a ticker
    pub async fn get_market_data(state: &AppState, ticker: &str) -> Result<MarketSnapshot> {
        info!("QuotesService::get_market_data - {}", ticker);

        let quote = with_retry(&state.retry_policy(), "get_quote", || {
            state.gateway.get_quote(ticker)
        })
        .await?;

        snapshot_from_quote(ticker, &quote)
    }

    /// Get the mid-price for a ticker
    pub async fn get_market_price(state: &AppState, ticker: &str) -> Result<f64> {
        Ok(Self::get_market_data(state, ticker).await?.market_price)
    }
}

/// Parse a gateway quote into a snapshot
pub fn snapshot_from_quote(ticker: &str, quote: &RawQuote) -> Result<MarketSnapshot> {
    let bid = required(&quote.bid, "bid", ticker)?;
    let ask = required(&quote.ask, "ask", ticker)?;
    let market_price = (bid + ask) / 2.0;

    if market_price <= 0.0 {
        return Err(AppError::Gateway(format!(
            "{}: no usable market price (bid {}, ask {})",
            ticker, bid, ask
        )));
    }

    Ok(MarketSnapshot {
        ticker: ticker.to_string(),
        market_price,
        bid,
        ask,
        high_52: quote.high52.as_ref().and_then(NumericField::as_f64),
        low_52: quote.low52.as_ref().and_then(NumericField::as_f64),
        beta: quote.beta.as_ref().and_then(NumericField::as_f64),
        next_earnings_date: quote.next_earning_date.clone().filter(|d| !d.trim().is_empty()),
        company_name: quote.company_name.clone(),
    })
}

fn required(field: &Option<NumericField>, name: &str, ticker: &str) -> Result<f64> {
    field
        .as_ref()
        .and_then(NumericField::as_f64)
        .ok_or_else(|| AppError::MalformedRecord(format!("{}: quote field {} missing or not numeric", ticker, name)))
}
