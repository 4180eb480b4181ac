//! Options Service
//!
//! The single-ticker screening pipeline: market price, strike window, expiry
//! selection, chain fetch and prune, metrics, then the filter cascade. Runs
//! sequentially; each gateway call is retried independently.

use crate::error::Result;
use crate::models::{market_today, Contract, ExpiryDate, MarketSnapshot, OptionsQuery};
use crate::services::chain_service::ChainService;
use crate::services::filter_cascade::{self, CascadeReport, Thresholds};
use crate::services::quotes_service::QuotesService;
use crate::services::retry::with_retry;
use crate::services::strike_window::{self, StrikeWindow};
use crate::services::{expiry_selector, metrics};
use crate::state::AppState;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Screening result for one ticker
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsScreen {
    pub ticker: String,
    pub market_price: f64,
    pub strike_window: StrikeWindow,
    pub expiry_dates: Vec<ExpiryDate>,
    pub contracts: Vec<Contract>,
    pub report: CascadeReport,
}

/// Options service for business logic
pub struct OptionsService;

impl OptionsService {
    /// Screened, augmented put contracts for a query
    pub async fn get_options_info(state: &AppState, query: &OptionsQuery) -> Result<Vec<Contract>> {
        Ok(Self::screen(state, query).await?.contracts)
    }

    /// Market snapshot for a ticker
    pub async fn get_market_data(state: &AppState, ticker: &str) -> Result<MarketSnapshot> {
        QuotesService::get_market_data(state, ticker).await
    }

    /// Run the full pipeline, fetching a fresh market snapshot
    pub async fn screen(state: &AppState, query: &OptionsQuery) -> Result<OptionsScreen> {
        info!("OptionsService::screen - {}", query.ticker);
        query.validate()?;

        let snapshot = QuotesService::get_market_data(state, &query.ticker).await?;
        Self::run(state, query, &snapshot, market_today).await
    }

    /// Run the pipeline against a snapshot the caller already fetched
    pub async fn screen_with_snapshot(
        state: &AppState,
        query: &OptionsQuery,
        snapshot: &MarketSnapshot,
    ) -> Result<OptionsScreen> {
        query.validate()?;
        Self::run(state, query, snapshot, market_today).await
    }

    async fn run<F>(
        state: &AppState,
        query: &OptionsQuery,
        snapshot: &MarketSnapshot,
        today: F,
    ) -> Result<OptionsScreen>
    where
        F: Fn() -> NaiveDate,
    {
        let ticker = query.ticker.as_str();

        let window = strike_window::resolve(
            snapshot.market_price,
            query.min_strike_pct,
            query.max_strike_pct,
            query.increment,
        )?;
        info!(
            "Restricting strike price to [{}, {}) for {:.2} market price",
            window.absolute_min, window.absolute_max, snapshot.market_price
        );

        let raw_dates = with_retry(&state.retry_policy(), "get_expiry_dates", || {
            state.gateway.get_expiry_dates(ticker)
        })
        .await?;
        let expiries =
            expiry_selector::select(&raw_dates, query.month_look_ahead, query.include_nearest)?;
        info!("Restricting search to {} valid expiry dates", expiries.len());

        let contracts =
            ChainService::fetch_and_prune(state, ticker, &expiries, &window, snapshot.market_price)
                .await?;

        // Days to expiry are counted from when the metrics are computed
        let augmented = metrics::augment_all(
            contracts,
            query.contracts_to_buy,
            today(),
            state.settings.degenerate_expiry,
        );

        let (survivors, mut report) =
            filter_cascade::apply(augmented.contracts, &Thresholds::from(query));
        report.degenerate_rejected = augmented.degenerate_rejected;

        Ok(OptionsScreen {
            ticker: ticker.to_string(),
            market_price: snapshot.market_price,
            strike_window: window,
            expiry_dates: expiries,
            contracts: survivors,
            report,
        })
    }
}
