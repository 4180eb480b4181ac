use clap::{Args, Parser, Subcommand};
use option_chains::OptionsQuery;
use std::path::PathBuf;

/// Cash-secured put screener over live or recorded option chains
#[derive(Parser)]
#[command(name = "option-chains", version, about)]
pub struct Cli {
    /// Settings JSON file (environment variables override it)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve market data from a recorded fixture file instead of E*Trade
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the market snapshot for a ticker
    Quote {
        ticker: String,
    },

    /// Screen one ticker's puts
    Options {
        ticker: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Screen every ticker in a universe file
    Batch {
        /// JSON list of {ticker, sector, sub_sector}
        universe: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

/// Overrides for the configured query defaults
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Lowest strike, in percent below market
    #[arg(long)]
    pub min_strike_pct: Option<f64>,

    /// Highest strike, in percent below market
    #[arg(long)]
    pub max_strike_pct: Option<f64>,

    /// Strike spacing (1, 2.5, 5, 10, 50 or 100)
    #[arg(long)]
    pub increment: Option<f64>,

    /// Number of monthly expiries to consider
    #[arg(long)]
    pub look_ahead: Option<u32>,

    /// Skip the nearest monthly expiry
    #[arg(long)]
    pub exclude_nearest: bool,

    #[arg(long)]
    pub min_volume: Option<i64>,

    #[arg(long)]
    pub min_open_interest: Option<i64>,

    /// Minimum annualized return, in percent
    #[arg(long, allow_hyphen_values = true)]
    pub min_annualized_return: Option<f64>,

    /// Cap on contracts per put (0 for no cap)
    #[arg(long)]
    pub contracts: Option<u32>,
}

impl FilterArgs {
    pub fn apply(&self, defaults: &OptionsQuery, ticker: &str) -> OptionsQuery {
        let mut query = defaults.for_ticker(ticker);
        if let Some(pct) = self.min_strike_pct {
            query.min_strike_pct = pct;
        }
        if let Some(pct) = self.max_strike_pct {
            query.max_strike_pct = pct;
        }
        if let Some(increment) = self.increment {
            query.increment = increment;
        }
        if let Some(months) = self.look_ahead {
            query.month_look_ahead = months;
        }
        if self.exclude_nearest {
            query.include_nearest = false;
        }
        if let Some(volume) = self.min_volume {
            query.min_volume = volume;
        }
        if let Some(open_interest) = self.min_open_interest {
            query.min_open_interest = open_interest;
        }
        if let Some(pct) = self.min_annualized_return {
            query.min_annualized_return = pct;
        }
        if let Some(contracts) = self.contracts {
            query.contracts_to_buy = Some(contracts);
        }
        query
    }
}
