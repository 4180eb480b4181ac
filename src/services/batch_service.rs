//! Batch Service
//!
//! Runs the single-ticker pipeline across a ticker universe on a bounded
//! worker pool. Tickers high in their 52-week range are skipped before any
//! chain is fetched. A failing ticker is logged and reported; it never aborts
//! the batch.

use crate::error::{AppError, ErrorResponse, Result};
use crate::models::{Contract, OptionsQuery};
use crate::services::options_service::OptionsService;
use crate::services::quotes_service::QuotesService;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// One ticker and its grouping metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub ticker: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub sub_sector: Option<String>,
}

/// Tickers to screen in a batch, in report order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Universe {
    pub entries: Vec<UniverseEntry>,
}

impl Universe {
    /// Load a JSON list of `{ticker, sector, sub_sector}` records
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read universe {}: {}", path.display(), e))
        })?;
        let universe: Universe = serde_json::from_str(&text)?;

        if let Some(entry) = universe.entries.iter().find(|e| e.ticker.trim().is_empty()) {
            return Err(AppError::Config(format!("Universe entry without a ticker: {:?}", entry)));
        }
        Ok(universe)
    }

    pub fn from_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: tickers
                .into_iter()
                .map(|t| UniverseEntry {
                    ticker: t.into(),
                    sector: None,
                    sub_sector: None,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A screened contract tagged with its ticker's grouping metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub ticker: String,
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    #[serde(flatten)]
    pub contract: Contract,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTicker {
    pub ticker: String,
    pub error: ErrorResponse,
}

/// Combined batch result
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Rows from every screened ticker, in universe order
    pub rows: Vec<BatchRow>,
    pub skipped: Vec<SkippedTicker>,
    pub failed: Vec<FailedTicker>,
}

enum TickerOutcome {
    Rows(Vec<BatchRow>),
    Skipped(String),
}

/// Batch service for multi-ticker screening
pub struct BatchService;

impl BatchService {
    /// Screen every ticker in `universe` with the shared filter parameters.
    ///
    /// Only an invalid query fails the whole batch; per-ticker errors land in
    /// `BatchOutcome::failed`.
    pub async fn run(
        state: Arc<AppState>,
        universe: &Universe,
        query: &OptionsQuery,
    ) -> Result<BatchOutcome> {
        query.validate()?;

        let workers = state.settings.batch.workers.max(1);
        info!(
            "BatchService::run - {} tickers, {} workers",
            universe.len(),
            workers
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for (index, entry) in universe.entries.iter().cloned().enumerate() {
            let state = state.clone();
            let semaphore = semaphore.clone();
            let query = query.for_ticker(&entry.ticker);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => Self::screen_ticker(&state, &entry, &query).await,
                    Err(e) => Err(AppError::Internal(format!("Worker pool closed: {}", e))),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<TickerOutcome>>> =
            (0..universe.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => error!("Batch worker aborted: {}", e),
            }
        }

        let mut outcome = BatchOutcome::default();
        for (entry, result) in universe.entries.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                Err(AppError::Internal("Worker panicked before reporting".to_string()))
            });
            match result {
                Ok(TickerOutcome::Rows(rows)) => outcome.rows.extend(rows),
                Ok(TickerOutcome::Skipped(reason)) => outcome.skipped.push(SkippedTicker {
                    ticker: entry.ticker.clone(),
                    reason,
                }),
                Err(e) => {
                    error!("Skipping {} after failure: {}", entry.ticker, e);
                    outcome.failed.push(FailedTicker {
                        ticker: entry.ticker.clone(),
                        error: ErrorResponse::from(e),
                    });
                }
            }
        }

        info!(
            "Batch complete: {} rows, {} tickers skipped, {} failed",
            outcome.rows.len(),
            outcome.skipped.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    async fn screen_ticker(
        state: &AppState,
        entry: &UniverseEntry,
        query: &OptionsQuery,
    ) -> Result<TickerOutcome> {
        let snapshot = QuotesService::get_market_data(state, &entry.ticker).await?;

        let max_position = state.settings.batch.max_range_position_pct;
        match snapshot.range_position_pct() {
            Some(position) if position > max_position => {
                info!(
                    "{} trading at {:.1}% of its 52-week range, skipping",
                    entry.ticker, position
                );
                return Ok(TickerOutcome::Skipped(format!(
                    "trading at {:.1}% of 52-week range (max {}%)",
                    position, max_position
                )));
            }
            Some(_) => {}
            None => warn!("{} has no usable 52-week range, not pre-filtering", entry.ticker),
        }

        let screen = OptionsService::screen_with_snapshot(state, query, &snapshot).await?;
        Ok(TickerOutcome::Rows(
            screen
                .contracts
                .into_iter()
                .map(|contract| BatchRow {
                    ticker: entry.ticker.clone(),
                    sector: entry.sector.clone(),
                    sub_sector: entry.sub_sector.clone(),
                    contract,
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::fixture::FixtureGateway;
    use crate::brokers::types::*;
    use crate::brokers::MarketDataGateway;
    use crate::models::market_today;
    use crate::state::test_settings;
    use async_trait::async_trait;
    use chrono::{Datelike, Duration, NaiveDate};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixture gateway that holds each quote call open and tracks how many
    /// overlap. Quotes for `panic_ticker` panic.
    struct SlowQuotes {
        inner: FixtureGateway,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        panic_ticker: Option<&'static str>,
    }

    impl SlowQuotes {
        fn new(inner: FixtureGateway) -> Self {
            Self {
                inner,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                panic_ticker: None,
            }
        }
    }

    #[async_trait]
    impl MarketDataGateway for SlowQuotes {
        fn id(&self) -> &'static str {
            "slow"
        }

        async fn get_quote(&self, ticker: &str) -> Result<RawQuote> {
            if self.panic_ticker == Some(ticker) {
                panic!("quote handler crashed for {}", ticker);
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.get_quote(ticker).await
        }

        async fn get_expiry_dates(&self, ticker: &str) -> Result<Vec<RawExpiryDate>> {
            self.inner.get_expiry_dates(ticker).await
        }

        async fn get_option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<Vec<OptionPair>> {
            self.inner.get_option_chain(ticker, expiry).await
        }
    }

    fn quote(mid: f64, low: f64, high: f64) -> RawQuote {
        RawQuote {
            bid: Some((mid - 0.5).into()),
            ask: Some((mid + 0.5).into()),
            high52: Some(high.into()),
            low52: Some(low.into()),
            ..RawQuote::default()
        }
    }

    fn put(strike: f64) -> OptionPair {
        OptionPair {
            call: None,
            put: Some(OptionLeg {
                bid: Some(1.0.into()),
                ask: Some(1.0.into()),
                volume: Some(10.0.into()),
                open_interest: Some(10.0.into()),
                strike_price: Some(strike.into()),
                symbol: format!("${} Put", strike),
                option_type: "PUT".into(),
                ..OptionLeg::default()
            }),
        }
    }

    /// Ticker at `mid` with one monthly expiry 30 days out and puts at 100 and 105
    fn with_ticker(gateway: FixtureGateway, ticker: &str, mid: f64, low: f64, high: f64) -> FixtureGateway {
        let expiry = market_today() + Duration::days(30);
        gateway
            .with_quote(ticker, quote(mid, low, high))
            .with_expiry_dates(
                ticker,
                vec![RawExpiryDate {
                    year: expiry.year() as u32,
                    month: expiry.month(),
                    day: expiry.day(),
                    expiry_type: ExpiryCadence::Monthly,
                }],
            )
            .with_chain(ticker, expiry, vec![put(100.0), put(105.0)])
    }

    fn query() -> OptionsQuery {
        OptionsQuery {
            min_strike_pct: 30.0,
            max_strike_pct: 20.0,
            increment: 5.0,
            month_look_ahead: 1,
            contracts_to_buy: None,
            ..OptionsQuery::default()
        }
    }

    fn universe() -> Universe {
        Universe {
            entries: vec![
                UniverseEntry {
                    ticker: "AAA".into(),
                    sector: Some("Technology".into()),
                    sub_sector: Some("Software".into()),
                },
                UniverseEntry {
                    ticker: "BAD".into(),
                    sector: Some("Energy".into()),
                    sub_sector: None,
                },
                UniverseEntry {
                    ticker: "HIGH".into(),
                    sector: None,
                    sub_sector: None,
                },
                UniverseEntry {
                    ticker: "ZZZ".into(),
                    sector: Some("Utilities".into()),
                    sub_sector: None,
                },
            ],
        }
    }

    fn gateway() -> FixtureGateway {
        let gateway = with_ticker(FixtureGateway::new(), "AAA", 140.0, 100.0, 200.0);
        let gateway = with_ticker(gateway, "BAD", 140.0, 100.0, 200.0).with_failing_ticker("BAD");
        let gateway = with_ticker(gateway, "HIGH", 140.0, 40.0, 150.0);
        with_ticker(gateway, "ZZZ", 140.0, 120.0, 170.0)
    }

    #[tokio::test]
    async fn test_failing_ticker_is_isolated() {
        let gateway = Arc::new(gateway());
        let state = Arc::new(AppState::new(gateway.clone(), test_settings()));

        let outcome = BatchService::run(state, &universe(), &query()).await.unwrap();

        let tickers: Vec<&str> = outcome.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "AAA", "ZZZ", "ZZZ"]);
        assert_eq!(outcome.rows[0].sector.as_deref(), Some("Technology"));
        assert_eq!(outcome.rows[0].sub_sector.as_deref(), Some("Software"));
        assert!(outcome.rows.iter().all(|r| r.contract.auxiliary_info.is_some()));

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].ticker, "BAD");
        assert_eq!(outcome.failed[0].error.code, "TRANSIENT_GATEWAY");

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].ticker, "HIGH");
    }

    #[tokio::test]
    async fn test_skipped_ticker_fetches_no_chain() {
        let gateway = Arc::new(with_ticker(FixtureGateway::new(), "HIGH", 140.0, 40.0, 150.0));
        let state = Arc::new(AppState::new(gateway.clone(), test_settings()));

        let outcome = BatchService::run(state, &Universe::from_tickers(["HIGH"]), &query())
            .await
            .unwrap();

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(gateway.calls("get_quote"), 1);
        assert_eq!(gateway.calls("get_expiry_dates"), 0);
        assert_eq!(gateway.calls("get_option_chain"), 0);
    }

    #[tokio::test]
    async fn test_worker_pool_is_bounded() {
        let tickers: Vec<String> = (0..12).map(|i| format!("T{:02}", i)).collect();
        let fixtures = tickers
            .iter()
            .fold(FixtureGateway::new(), |g, t| with_ticker(g, t, 140.0, 100.0, 200.0));
        let gateway = Arc::new(SlowQuotes::new(fixtures));

        let mut settings = test_settings();
        settings.batch.workers = 3;
        let state = Arc::new(AppState::new(gateway.clone(), settings));

        let outcome = BatchService::run(state, &Universe::from_tickers(tickers), &query())
            .await
            .unwrap();

        assert_eq!(outcome.rows.len(), 24);
        assert!(outcome.failed.is_empty());
        assert_eq!(gateway.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_isolated() {
        let mut gateway = SlowQuotes::new(gateway());
        gateway.panic_ticker = Some("BOOM");
        let state = Arc::new(AppState::new(Arc::new(gateway), test_settings()));

        let outcome = BatchService::run(state, &Universe::from_tickers(["AAA", "BOOM", "ZZZ"]), &query())
            .await
            .unwrap();

        let tickers: Vec<&str> = outcome.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "AAA", "ZZZ", "ZZZ"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].ticker, "BOOM");
        assert_eq!(outcome.failed[0].error.code, "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_ticker_without_range_is_screened() {
        let gateway = with_ticker(FixtureGateway::new(), "NEW", 140.0, 100.0, 200.0).with_quote(
            "NEW",
            RawQuote {
                bid: Some(139.5.into()),
                ask: Some(140.5.into()),
                ..RawQuote::default()
            },
        );
        let state = Arc::new(AppState::new(Arc::new(gateway), test_settings()));

        let outcome = BatchService::run(state, &Universe::from_tickers(["NEW"]), &query())
            .await
            .unwrap();
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_ticker_reported_as_failed() {
        let state = Arc::new(AppState::new(Arc::new(gateway()), test_settings()));
        let outcome = BatchService::run(state, &Universe::from_tickers(["AAA", "NOPE"]), &query())
            .await
            .unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].error.code, "GATEWAY_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_query_fails_whole_batch() {
        let gateway = Arc::new(gateway());
        let state = Arc::new(AppState::new(gateway.clone(), test_settings()));
        let query = OptionsQuery {
            min_strike_pct: 10.0,
            ..query()
        };

        let result = BatchService::run(state, &universe(), &query).await;
        assert!(matches!(result, Err(AppError::InvalidParameter(_))));
        assert_eq!(gateway.calls("get_quote"), 0);
    }

    #[test]
    fn test_load_universe() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"ticker": "GOOG", "sector": "Communication Services", "sub_sector": "Interactive Media"}},
                {{"ticker": "XOM"}}]"#
        )
        .unwrap();

        let universe = Universe::load(file.path()).unwrap();
        assert_eq!(universe.len(), 2);
        assert_eq!(universe.entries[1].sector, None);

        let mut blank = tempfile::NamedTempFile::new().unwrap();
        write!(blank, r#"[{{"ticker": " "}}]"#).unwrap();
        assert!(matches!(Universe::load(blank.path()), Err(AppError::Config(_))));

        let missing = Universe::load(Path::new("/nonexistent/universe.json"));
        assert!(matches!(missing, Err(AppError::Config(_))));
    }
}
