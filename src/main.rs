//! CryptoSpark - Cryptocurrency market data in the terminal
//!
//! Prints the top coins by market cap, per-coin market data and price charts from
//! the CoinGecko API, served from a local cache when possible.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cryptospark::cache::{CacheManager, CacheStore};
use cryptospark::cli::{CacheAction, Cli, Command};
use cryptospark::data::{DataSource, FetchClient, Fetched};
use cryptospark::ui::{self, SPARKLINE_WIDTH};

/// Logs go to stderr so stdout only carries data
fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("cryptospark=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cryptospark=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Unwraps a payload, telling the user on stderr when it is an expired copy
fn report_source<T>(what: &str, fetched: Fetched<T>) -> T {
    if fetched.source == DataSource::StaleCache {
        eprintln!(
            "Note: showing cached {} because the API could not be reached; it may be out of date",
            what
        );
    }
    fetched.data
}

fn run_cache_action(cli: &Cli, store: &Arc<dyn CacheStore>, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Clear => {
            store.clear().context("Failed to clear cache")?;
            println!("Cache cleared");
        }
        CacheAction::Path => match cli.cache_path()? {
            Some(path) => println!("{}", path.display()),
            None => println!("(in memory)"),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = cli.build_store()?;
    let config = cli.client_config();
    info!(base_url = %config.base_url, ttl_secs = config.ttl.as_secs(), "Starting CryptoSpark");
    let client = FetchClient::new(config, CacheManager::new(store.clone()))
        .context("Failed to create HTTP client")?;

    match &cli.command {
        Command::Markets { search, json } => {
            let coins = report_source("market list", client.coins_markets_with_source().await?);
            if *json {
                print_json(&coins)?;
            } else {
                print!("{}", ui::render_markets(&coins, search.as_deref()));
            }
        }
        Command::Coin { id, days, json } => {
            // The detail page loads both independently; a chart failure alone is not fatal
            let chart_request = async {
                match days {
                    Some(days) => Some(client.coin_market_chart_with_source(id, *days).await),
                    None => None,
                }
            };
            let (coin, chart) =
                futures::join!(client.coin_details_with_source(id), chart_request);
            let coin = report_source("coin data", coin?);
            let chart = chart.map(|result| match result {
                Ok(fetched) => Some(report_source("chart data", fetched)),
                Err(e) => {
                    eprintln!("Chart data unavailable: {}", e);
                    None
                }
            });

            if *json {
                print_json(&serde_json::json!({ "coin": coin, "chart": chart.flatten() }))?;
            } else {
                print!("{}", ui::render_coin(&coin));
                if let (Some(days), Some(Some(chart))) = (days, chart) {
                    println!();
                    print!("{}", ui::render_chart(id, *days, &chart, SPARKLINE_WIDTH));
                }
            }
        }
        Command::Chart { id, days, json } => {
            let chart = report_source(
                "chart data",
                client.coin_market_chart_with_source(id, *days).await?,
            );
            if *json {
                print_json(&chart)?;
            } else {
                print!("{}", ui::render_chart(id, *days, &chart, SPARKLINE_WIDTH));
            }
        }
        Command::Cache { action } => run_cache_action(&cli, &store, *action)?,
    }

    Ok(())
}
