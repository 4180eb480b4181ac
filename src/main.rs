use anyhow::Context;
use clap::Parser;
use option_chains::brokers::fixture::FixtureGateway;
use option_chains::services::{BatchService, OptionsService, QuotesService, Universe};
use option_chains::{AppState, Settings};
use serde::Serialize;
use std::sync::Arc;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    option_chains::init_tracing();

    let cli = cli::Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    let state = match &cli.fixture {
        Some(path) => {
            let gateway = FixtureGateway::load(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            tracing::info!("Using fixture gateway with {} tickers", gateway.tickers().len());
            AppState::new(Arc::new(gateway), settings)
        }
        None => AppState::etrade(settings)?,
    };

    match cli.command {
        cli::Command::Quote { ticker } => {
            let snapshot = QuotesService::get_market_data(&state, &ticker.to_uppercase()).await?;
            print_json(&snapshot)
        }
        cli::Command::Options { ticker, filters } => {
            let query = filters.apply(&state.settings.defaults, &ticker.to_uppercase());
            let screen = OptionsService::screen(&state, &query).await?;
            print_json(&screen)
        }
        cli::Command::Batch { universe, filters } => {
            let universe = Universe::load(&universe)
                .with_context(|| format!("loading universe {}", universe.display()))?;
            let query = filters.apply(&state.settings.defaults, &state.settings.defaults.ticker);
            let outcome = BatchService::run(Arc::new(state), &universe, &query).await?;
            print_json(&outcome)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
