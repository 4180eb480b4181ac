//! Option Chains - Cash-secured put screener
//!
//! Screens a ticker's put options for contracts worth writing: a strike
//! window below market, the next few monthly expiries, yield metrics, and
//! liquidity/return thresholds. Market data comes from the E*Trade API or
//! from recorded fixtures.

pub mod brokers;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::Settings;
pub use error::{AppError, Result};
pub use models::{Contract, MarketSnapshot, OptionsQuery};
pub use state::AppState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "option_chains=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
