//! Per-contract yield metrics

use crate::config::DegenerateExpiryPolicy;
use crate::models::{AuxiliaryInfo, Contract};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Shares per option contract
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Round to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `365 / days`, or zero once the contract is at or past expiry
pub fn annualize_factor(days_to_hold: i64) -> f64 {
    if days_to_hold > 0 {
        DAYS_PER_YEAR / days_to_hold as f64
    } else {
        0.0
    }
}

/// Distance of the strike below market, in percent, one decimal
pub fn below_market_pct(contract: &Contract) -> f64 {
    round_to(
        (contract.market_price - contract.strike_price) / contract.market_price * 100.0,
        1,
    )
}

/// Contracts to write: the full volume, or the cap when one is set
pub fn contracts_to_buy(volume: i64, cap: Option<u32>) -> i64 {
    match cap {
        Some(cap) if cap > 0 => (cap as i64).min(volume),
        _ => volume,
    }
}

/// Derived metrics for one contract as of `today`
pub fn compute(contract: &Contract, cap: Option<u32>, today: NaiveDate) -> AuxiliaryInfo {
    let contracts = contracts_to_buy(contract.volume, cap);

    let contract_price = (contract.bid + contract.ask) / 2.0;
    let revenue = contract_price * CONTRACT_MULTIPLIER * contracts as f64;

    let factor = annualize_factor(contract.expiry_date.days_from(today));

    AuxiliaryInfo {
        contracts_to_buy: contracts,
        revenue: round_to(revenue, 2),
        annualized_revenue: (revenue * factor).trunc() as i64,
        annualized_return: round_to(revenue / contract.strike_price * factor, 2),
        notional_principle: (contract.strike_price * CONTRACT_MULTIPLIER * contracts as f64).round(),
    }
}

/// Attach `belowMarketPct` and auxiliary info; nothing else changes
pub fn augment(mut contract: Contract, cap: Option<u32>, today: NaiveDate) -> Contract {
    contract.below_market_pct = Some(below_market_pct(&contract));
    contract.auxiliary_info = Some(compute(&contract, cap, today));
    contract
}

/// Augmented contracts plus the count dropped by the degenerate-expiry policy
#[derive(Debug, Clone)]
pub struct AugmentOutcome {
    pub contracts: Vec<Contract>,
    pub degenerate_rejected: usize,
}

/// Augment a contract list, applying the degenerate-expiry policy
pub fn augment_all(
    contracts: Vec<Contract>,
    cap: Option<u32>,
    today: NaiveDate,
    policy: DegenerateExpiryPolicy,
) -> AugmentOutcome {
    let total = contracts.len();
    let mut augmented = Vec::with_capacity(total);
    let mut degenerate = 0;

    for contract in contracts {
        if contract.expiry_date.days_from(today) <= 0 {
            degenerate += 1;
            if policy == DegenerateExpiryPolicy::Reject {
                continue;
            }
        }
        augmented.push(augment(contract, cap, today));
    }

    if degenerate > 0 {
        match policy {
            DegenerateExpiryPolicy::Reject => {
                info!("Rejecting {} puts at or past expiry", degenerate)
            }
            DegenerateExpiryPolicy::ZeroYield => {
                warn!("{} puts at or past expiry reported with zero annualized yield", degenerate)
            }
        }
    }

    AugmentOutcome {
        contracts: augmented,
        degenerate_rejected: if policy == DegenerateExpiryPolicy::Reject { degenerate } else { 0 },
    }
}
