//! Expiry date selection

use crate::brokers::types::{ExpiryCadence, RawExpiryDate};
use crate::error::{AppError, Result};
use crate::models::ExpiryDate;
use chrono::NaiveDate;

/// Keep monthly expiries in gateway order and take the look-ahead prefix.
///
/// With `include_nearest == false` the first monthly date is dropped from
/// the prefix; the prefix is not extended to compensate.
pub fn select(
    dates: &[RawExpiryDate],
    month_look_ahead: u32,
    include_nearest: bool,
) -> Result<Vec<ExpiryDate>> {
    let monthly: Vec<&RawExpiryDate> = dates
        .iter()
        .filter(|d| d.expiry_type == ExpiryCadence::Monthly)
        .collect();

    let start = if include_nearest { 0 } else { 1 };
    let end = (month_look_ahead as usize).min(monthly.len());

    if start >= end {
        return Ok(Vec::new());
    }

    // Only dates inside the prefix are parsed
    monthly[start..end]
        .iter()
        .map(|raw| to_expiry_date(raw))
        .collect()
}

fn to_expiry_date(raw: &RawExpiryDate) -> Result<ExpiryDate> {
    let date = NaiveDate::from_ymd_opt(raw.year as i32, raw.month, raw.day).ok_or_else(|| {
        AppError::MalformedRecord(format!(
            "invalid expiry date {}-{}-{}",
            raw.year, raw.month, raw.day
        ))
    })?;

    Ok(ExpiryDate {
        date,
        cadence: raw.expiry_type,
    })
}
