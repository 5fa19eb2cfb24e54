//! Command-line interface parsing for CryptoSpark
//!
//! This module handles parsing of CLI arguments using clap and turns them into the
//! client configuration and cache store the application runs with.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::{CacheStore, FileStore, MemoryStore, DEFAULT_QUOTA_BYTES, DEFAULT_TTL};
use crate::config::{ClientConfig, DEFAULT_BASE_URL};

/// Default chart window in days
pub const DEFAULT_CHART_DAYS: u32 = 7;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The day window is not a positive integer
    #[error("Invalid days: '{0}'. Expected a positive whole number such as 7 or 30")]
    InvalidDays(String),

    /// No cache directory could be determined and none was given
    #[error("Could not determine a cache directory; pass --cache-dir or --no-cache")]
    NoCacheDir,
}

/// CryptoSpark - Cryptocurrency market data and price charts
#[derive(Parser, Debug)]
#[command(name = "cryptospark")]
#[command(about = "Cryptocurrency market data and price charts from CoinGecko")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Root URL of the CoinGecko-compatible API
    #[arg(long, global = true, env = "CRYPTOSPARK_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Directory holding the response cache
    #[arg(long, global = true, env = "CRYPTOSPARK_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache size limit in bytes; the cache is wiped when a write would exceed it
    #[arg(long, global = true, default_value_t = DEFAULT_QUOTA_BYTES, value_name = "BYTES")]
    pub cache_quota: usize,

    /// Seconds a cached response is preferred over the network
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TTL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECS"
    )]
    pub ttl_secs: u64,

    /// Abort requests that take longer than this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Keep the cache in memory only for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Log cache and network activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Top 50 coins by market cap
    Markets {
        /// Only show coins whose name or symbol contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Market data for one coin
    Coin {
        /// CoinGecko coin id, e.g. bitcoin
        id: String,
        /// Also show a price chart over this many days
        #[arg(long, value_parser = parse_days_arg)]
        days: Option<u32>,
        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Price history for one coin
    Chart {
        /// CoinGecko coin id, e.g. bitcoin
        id: String,
        /// Window in days (1 shows hourly labels)
        #[arg(long, default_value_t = DEFAULT_CHART_DAYS, value_parser = parse_days_arg)]
        days: u32,
        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or reset the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Delete every cached response
    Clear,
    /// Print where the cache is stored
    Path,
}

/// Parses a chart window argument.
///
/// # Returns
/// * `Ok(days)` for a whole number of at least 1
/// * `Err(CliError::InvalidDays)` otherwise
pub fn parse_days_arg(s: &str) -> Result<u32, CliError> {
    match s.trim().parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(CliError::InvalidDays(s.to_string())),
    }
}

impl Cli {
    /// Client configuration derived from the global flags
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::default()
            .with_base_url(self.api_url.as_str())
            .with_ttl(Duration::from_secs(self.ttl_secs));
        match self.timeout_secs {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    /// Location of the on-disk cache, `None` when running with `--no-cache`
    pub fn cache_path(&self) -> Result<Option<PathBuf>, CliError> {
        if self.no_cache {
            return Ok(None);
        }
        Ok(Some(self.file_store()?.path().to_path_buf()))
    }

    /// Builds the store the cache lives in
    pub fn build_store(&self) -> Result<Arc<dyn CacheStore>, CliError> {
        if self.no_cache {
            return Ok(Arc::new(MemoryStore::with_quota(self.cache_quota)));
        }
        Ok(Arc::new(self.file_store()?))
    }

    fn file_store(&self) -> Result<FileStore, CliError> {
        let store = match &self.cache_dir {
            Some(dir) => FileStore::with_dir(dir.clone()),
            None => FileStore::new().ok_or(CliError::NoCacheDir)?,
        };
        Ok(store.with_quota(self.cache_quota))
    }
}
