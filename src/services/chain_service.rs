//! Chain fetching and pruning
//!
//! One chain request per selected expiry. Only the put leg of each pair is
//! kept, and only when its truncated strike is a candidate strike. This is
//! also where the gateway's string-typed numbers are parsed and validated.

use crate::brokers::types::{NumericField, OptionLeg, OptionPair};
use crate::error::{AppError, Result};
use crate::models::{Contract, ExpiryDate};
use crate::services::retry::with_retry;
use crate::services::strike_window::StrikeWindow;
use crate::state::AppState;
use tracing::{debug, info};

/// Chain service for fetching and pruning option chains
pub struct ChainService;

impl ChainService {
    /// Fetch every selected expiry's chain and keep candidate-strike puts.
    ///
    /// Output order is expiry order, then the gateway's order within a chain.
    pub async fn fetch_and_prune(
        state: &AppState,
        ticker: &str,
        expiries: &[ExpiryDate],
        window: &StrikeWindow,
        market_price: f64,
    ) -> Result<Vec<Contract>> {
        let mut contracts = Vec::new();

        for expiry in expiries {
            let pairs = with_retry(&state.retry_policy(), "get_option_chain", || {
                state.gateway.get_option_chain(ticker, expiry.date)
            })
            .await?;

            let pair_count = pairs.len();
            let kept = prune(&pairs, *expiry, window, market_price)?;
            debug!(
                "{} {}: kept {} of {} option pairs",
                ticker,
                expiry.date,
                kept.len(),
                pair_count
            );
            contracts.extend(kept);
        }

        info!(
            "Found {} options for {} expiry dates and {} candidate strikes",
            contracts.len(),
            expiries.len(),
            window.candidates.len()
        );

        Ok(contracts)
    }
}

/// Keep the put legs whose truncated strike is in the window
pub fn prune(
    pairs: &[OptionPair],
    expiry: ExpiryDate,
    window: &StrikeWindow,
    market_price: f64,
) -> Result<Vec<Contract>> {
    let mut kept = Vec::new();

    for put in pairs.iter().filter_map(|pair| pair.put.as_ref()) {
        let strike = truncated_strike(put)?;
        if window.contains(strike) {
            kept.push(parse_put(put, expiry, market_price)?);
        }
    }

    Ok(kept)
}

/// Strike truncated toward zero: 49.99 is treated as 49
pub fn truncated_strike(leg: &OptionLeg) -> Result<i64> {
    Ok(required(&leg.strike_price, "strikePrice", &leg.symbol)?.trunc() as i64)
}

/// Project a put leg onto a pipeline contract
pub fn parse_put(leg: &OptionLeg, expiry: ExpiryDate, market_price: f64) -> Result<Contract> {
    Ok(Contract {
        bid: required(&leg.bid, "bid", &leg.symbol)?,
        ask: required(&leg.ask, "ask", &leg.symbol)?,
        last_price: optional(&leg.last_price, "lastPrice", &leg.symbol)?,
        volume: required(&leg.volume, "volume", &leg.symbol)?.trunc() as i64,
        open_interest: required(&leg.open_interest, "openInterest", &leg.symbol)?.trunc() as i64,
        strike_price: required(&leg.strike_price, "strikePrice", &leg.symbol)?,
        symbol: leg.symbol.clone(),
        option_type: leg.option_type.clone(),
        net_change: optional(&leg.net_change, "netChange", &leg.symbol)?,
        option_greeks: leg.option_greeks.clone(),
        expiry_date: expiry,
        market_price,
        below_market_pct: None,
        auxiliary_info: None,
    })
}

fn required(field: &Option<NumericField>, name: &str, symbol: &str) -> Result<f64> {
    match field {
        Some(value) => parse(value, name, symbol),
        None => Err(AppError::MalformedRecord(format!(
            "{}: missing {}",
            display_symbol(symbol),
            name
        ))),
    }
}

fn optional(field: &Option<NumericField>, name: &str, symbol: &str) -> Result<f64> {
    match field {
        Some(value) => parse(value, name, symbol),
        None => Ok(0.0),
    }
}

fn parse(value: &NumericField, name: &str, symbol: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        AppError::MalformedRecord(format!(
            "{}: {} is not numeric ({:?})",
            display_symbol(symbol),
            name,
            value
        ))
    })
}

fn display_symbol(symbol: &str) -> &str {
    if symbol.is_empty() {
        "<unknown symbol>"
    } else {
        symbol
    }
}
