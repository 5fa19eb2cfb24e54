//! Core data models for CryptoSpark
//!
//! Response shapes for the three CoinGecko endpoints the dashboard consumes,
//! plus the client that fetches them through the cache.

pub mod client;
pub mod endpoints;

pub use client::{ApiError, DataSource, FetchClient, Fetched};
pub use endpoints::{
    chart_endpoint, chart_params, coin_endpoint, coin_params, markets_params, MARKETS_ENDPOINT,
};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// One row of the market list, ordered by market cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    /// CoinGecko asset identifier (e.g. "bitcoin")
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Logo URL
    pub image: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    /// `None` for assets without a supply cap
    pub total_supply: Option<f64>,
}

impl CoinMarket {
    /// Case-insensitive match of `term` against name or symbol
    ///
    /// An empty term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.symbol.to_lowercase().contains(&term)
    }
}

/// Full market data for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: CoinImage,
    pub market_cap_rank: Option<u32>,
    pub market_data: MarketData,
    #[serde(default)]
    pub description: Description,
}

/// Logo URLs at three sizes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinImage {
    pub thumb: String,
    pub small: String,
    pub large: String,
}

/// Market figures for [`CoinDetail`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub current_price: UsdAmount,
    pub market_cap: UsdAmount,
    pub total_volume: UsdAmount,
    pub high_24h: UsdAmount,
    pub low_24h: UsdAmount,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

/// A per-currency amount of which only the US dollar value is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsdAmount {
    pub usd: Option<f64>,
}

/// Asset description; only English is requested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    pub en: String,
}

/// A `(timestamp in epoch milliseconds, value)` sample
pub type SeriesPoint = (i64, f64);

/// Parallel time series returned by the market chart endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChartData {
    pub prices: Vec<SeriesPoint>,
    pub market_caps: Vec<SeriesPoint>,
    pub total_volumes: Vec<SeriesPoint>,
}

/// A labelled price for plotting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataPoint {
    pub date: String,
    pub price: f64,
}

impl MarketChartData {
    /// Price series labelled in local time
    ///
    /// Labels are `HH:MM` for a one-day window and `Mon D` otherwise.
    pub fn price_points(&self, days: u32) -> Vec<ChartDataPoint> {
        self.price_points_in(days, &Local)
    }

    /// Price series labelled in the time zone `tz`
    pub fn price_points_in<Tz>(&self, days: u32, tz: &Tz) -> Vec<ChartDataPoint>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let format = if days == 1 { "%H:%M" } else { "%b %-d" };
        self.prices
            .iter()
            .filter_map(|&(timestamp, price)| {
                let date = tz.timestamp_millis_opt(timestamp).single()?;
                Some(ChartDataPoint {
                    date: date.format(format).to_string(),
                    price,
                })
            })
            .collect()
    }

    /// Just the price values, in time order
    pub fn price_values(&self) -> Vec<f64> {
        self.prices.iter().map(|&(_, price)| price).collect()
    }
}
