//! Strike window resolution
//!
//! Converts percent-below-market bounds into an absolute strike window and
//! the increment-aligned set of candidate strikes inside it.

use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Strike increments a query may use
pub const ALLOWED_INCREMENTS: [f64; 6] = [1.0, 2.5, 5.0, 10.0, 50.0, 100.0];

/// Absolute strike window for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeWindow {
    /// Inclusive lower bound
    pub absolute_min: i64,
    /// Exclusive upper bound
    pub absolute_max: i64,
    pub increment: f64,
    pub candidates: BTreeSet<i64>,
}

impl StrikeWindow {
    pub fn contains(&self, strike: i64) -> bool {
        self.candidates.contains(&strike)
    }
}

/// Check percent bounds and increment
pub fn validate(min_strike_pct: f64, max_strike_pct: f64, increment: f64) -> Result<()> {
    for (name, pct) in [("min_strike_pct", min_strike_pct), ("max_strike_pct", max_strike_pct)] {
        if !(pct > 0.0 && pct < 100.0) {
            return Err(AppError::InvalidParameter(format!(
                "{} must be strictly between 0 and 100, got {}",
                name, pct
            )));
        }
    }

    if min_strike_pct <= max_strike_pct {
        return Err(AppError::InvalidParameter(format!(
            "min_strike_pct ({}) must be greater than max_strike_pct ({}); both are percent below market",
            min_strike_pct, max_strike_pct
        )));
    }

    if !ALLOWED_INCREMENTS.contains(&increment) {
        return Err(AppError::InvalidParameter(format!(
            "increment must be one of {:?}, got {}",
            ALLOWED_INCREMENTS, increment
        )));
    }

    Ok(())
}

/// Resolve the strike window around `mid_price`
pub fn resolve(
    mid_price: f64,
    min_strike_pct: f64,
    max_strike_pct: f64,
    increment: f64,
) -> Result<StrikeWindow> {
    validate(min_strike_pct, max_strike_pct, increment)?;

    if !(mid_price > 0.0 && mid_price.is_finite()) {
        return Err(AppError::InvalidParameter(format!(
            "market price must be positive, got {}",
            mid_price
        )));
    }

    let absolute_max = (mid_price * (1.0 - max_strike_pct / 100.0)).floor() as i64;
    let absolute_min = (mid_price * (1.0 - min_strike_pct / 100.0)).floor() as i64;

    let candidates = (absolute_min..absolute_max)
        .filter(|strike| (*strike as f64) % increment == 0.0)
        .collect();

    Ok(StrikeWindow {
        absolute_min,
        absolute_max,
        increment,
        candidates,
    })
}
