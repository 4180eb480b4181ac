//! Post-hoc threshold filters
//!
//! Stages run in a fixed order, each on the survivors of the previous one,
//! and each reports how many contracts it rejected.

use crate::models::{Contract, OptionsQuery};
use serde::Serialize;
use tracing::info;

/// Minimum liquidity and yield a contract must meet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_volume: i64,
    pub min_open_interest: i64,
    pub min_annualized_return: f64,
}

impl Thresholds {
    /// Thresholds that reject nothing
    pub fn pass_all() -> Self {
        Self {
            min_volume: 0,
            min_open_interest: 0,
            min_annualized_return: f64::NEG_INFINITY,
        }
    }
}

impl From<&OptionsQuery> for Thresholds {
    fn from(query: &OptionsQuery) -> Self {
        Self {
            min_volume: query.min_volume,
            min_open_interest: query.min_open_interest,
            min_annualized_return: query.min_annualized_return,
        }
    }
}

/// One filter stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Volume,
    OpenInterest,
    AnnualizedReturn,
}

impl FilterStage {
    pub const ORDER: [FilterStage; 3] = [
        FilterStage::Volume,
        FilterStage::OpenInterest,
        FilterStage::AnnualizedReturn,
    ];

    fn passes(&self, contract: &Contract, thresholds: &Thresholds) -> bool {
        match self {
            FilterStage::Volume => contract.volume >= thresholds.min_volume,
            FilterStage::OpenInterest => contract.open_interest >= thresholds.min_open_interest,
            FilterStage::AnnualizedReturn => contract
                .annualized_return()
                .is_some_and(|r| r >= thresholds.min_annualized_return),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            FilterStage::Volume => "insufficient volume",
            FilterStage::OpenInterest => "insufficient open interest",
            FilterStage::AnnualizedReturn => "annualized return below threshold",
        }
    }
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: FilterStage,
    pub rejected: usize,
    pub remaining: usize,
}

/// Per-stage exclusion counts for a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub input: usize,
    /// Contracts dropped before filtering because they were at or past expiry
    pub degenerate_rejected: usize,
    pub stages: Vec<StageReport>,
}

impl CascadeReport {
    pub fn rejected_by(&self, stage: FilterStage) -> usize {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.rejected)
            .sum()
    }
}

/// Run the cascade in the standard order
pub fn apply(contracts: Vec<Contract>, thresholds: &Thresholds) -> (Vec<Contract>, CascadeReport) {
    apply_in_order(contracts, thresholds, &FilterStage::ORDER)
}

/// Run the given stages in order
pub fn apply_in_order(
    contracts: Vec<Contract>,
    thresholds: &Thresholds,
    order: &[FilterStage],
) -> (Vec<Contract>, CascadeReport) {
    let mut report = CascadeReport {
        input: contracts.len(),
        ..CascadeReport::default()
    };

    let mut survivors = contracts;
    for stage in order {
        let (kept, rejected): (Vec<Contract>, Vec<Contract>) = survivors
            .into_iter()
            .partition(|contract| stage.passes(contract, thresholds));

        info!("Hiding {} puts due to {}", rejected.len(), stage.reason());

        report.stages.push(StageReport {
            stage: *stage,
            rejected: rejected.len(),
            remaining: kept.len(),
        });
        survivors = kept;
    }

    info!("Returning {} valid options", survivors.len());
    (survivors, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuxiliaryInfo, ExpiryDate};
    use chrono::NaiveDate;

    fn contract(id: u32, volume: i64, open_interest: i64, annualized_return: f64) -> Contract {
        Contract {
            bid: 1.0,
            ask: 1.0,
            last_price: 1.0,
            volume,
            open_interest,
            strike_price: 100.0,
            symbol: format!("C{}", id),
            option_type: "PUT".into(),
            net_change: 0.0,
            option_greeks: None,
            expiry_date: ExpiryDate::monthly(NaiveDate::from_ymd_opt(2024, 2, 16).unwrap()),
            market_price: 120.0,
            below_market_pct: Some(16.7),
            auxiliary_info: Some(AuxiliaryInfo {
                contracts_to_buy: volume,
                revenue: 0.0,
                annualized_revenue: 0,
                annualized_return,
                notional_principle: 0.0,
            }),
        }
    }

    fn sample() -> Vec<Contract> {
        vec![
            contract(1, 0, 10, 12.0),
            contract(2, 5, 0, 30.0),
            contract(3, 5, 10, 2.5),
            contract(4, 8, 3, 15.0),
            contract(5, 1, 1, 8.0),
            contract(6, 0, 0, 1.0),
        ]
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            min_volume: 1,
            min_open_interest: 1,
            min_annualized_return: 8.0,
        }
    }

    fn symbols(contracts: &[Contract]) -> Vec<String> {
        contracts.iter().map(|c| c.symbol.clone()).collect()
    }

    #[test]
    fn test_stage_counts() {
        let (survivors, report) = apply(sample(), &thresholds());

        assert_eq!(symbols(&survivors), vec!["C4", "C5"]);
        assert_eq!(report.input, 6);
        assert_eq!(report.rejected_by(FilterStage::Volume), 2);
        assert_eq!(report.rejected_by(FilterStage::OpenInterest), 1);
        assert_eq!(report.rejected_by(FilterStage::AnnualizedReturn), 1);
        assert_eq!(report.stages.last().unwrap().remaining, 2);
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = apply(sample(), &thresholds());
        let (twice, report) = apply(once.clone(), &thresholds());
        assert_eq!(once, twice);
        assert!(report.stages.iter().all(|s| s.rejected == 0));
    }

    #[test]
    fn test_stage_order_does_not_change_survivors() {
        use FilterStage::*;
        let orders = [
            [Volume, OpenInterest, AnnualizedReturn],
            [Volume, AnnualizedReturn, OpenInterest],
            [OpenInterest, Volume, AnnualizedReturn],
            [OpenInterest, AnnualizedReturn, Volume],
            [AnnualizedReturn, Volume, OpenInterest],
            [AnnualizedReturn, OpenInterest, Volume],
        ];

        let (expected, _) = apply(sample(), &thresholds());
        for order in &orders {
            let (survivors, report) = apply_in_order(sample(), &thresholds(), order);
            let mut got = symbols(&survivors);
            got.sort();
            let mut want = symbols(&expected);
            want.sort();
            assert_eq!(got, want);

            let total: usize = report.stages.iter().map(|s| s.rejected).sum();
            assert_eq!(total, 4);
        }

        // Counts per stage depend on the order
        let (_, reordered) = apply_in_order(sample(), &thresholds(), &[AnnualizedReturn, Volume, OpenInterest]);
        assert_eq!(reordered.rejected_by(AnnualizedReturn), 2);
        assert_eq!(reordered.rejected_by(Volume), 1);
    }

    #[test]
    fn test_pass_all_keeps_everything() {
        let (survivors, report) = apply(sample(), &Thresholds::pass_all());
        assert_eq!(survivors, sample());

        // Stages that reject nothing still report
        let stages: Vec<FilterStage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, FilterStage::ORDER.to_vec());
        assert!(report.stages.iter().all(|s| s.rejected == 0 && s.remaining == 6));
    }

    #[test]
    fn test_unaugmented_contract_fails_return_stage() {
        let mut bare = contract(9, 5, 5, 0.0);
        bare.auxiliary_info = None;
        let (survivors, report) = apply(vec![bare], &Thresholds::pass_all());
        assert!(survivors.is_empty());
        assert_eq!(report.rejected_by(FilterStage::AnnualizedReturn), 1);
    }
}
