//! The three CoinGecko requests the dashboard makes
//!
//! Each one fixes its path and query parameters and names its response type;
//! caching and fallback are left to [`FetchClient::fetch`].

use super::{ApiError, CoinDetail, CoinMarket, FetchClient, Fetched, MarketChartData};
use crate::cache::QueryParams;

/// Path of the market list endpoint
pub const MARKETS_ENDPOINT: &str = "/coins/markets";

/// Quote currency for every request
const VS_CURRENCY: &str = "usd";

/// Number of coins on the market list
const MARKETS_PAGE_SIZE: u32 = 50;

/// Query for the top coins by market cap, first page, no sparkline
pub fn markets_params() -> QueryParams {
    QueryParams::new()
        .with("vs_currency", VS_CURRENCY)
        .with("order", "market_cap_desc")
        .with("per_page", MARKETS_PAGE_SIZE)
        .with("page", 1)
        .with("sparkline", false)
}

/// Query for a coin's market data with everything else switched off
pub fn coin_params() -> QueryParams {
    QueryParams::new()
        .with("localization", false)
        .with("tickers", false)
        .with("market_data", true)
        .with("community_data", false)
        .with("developer_data", false)
        .with("sparkline", false)
}

/// Query for `days` of chart history
pub fn chart_params(days: u32) -> QueryParams {
    QueryParams::new()
        .with("vs_currency", VS_CURRENCY)
        .with("days", days)
}

/// Path of the detail endpoint for `id`
pub fn coin_endpoint(id: &str) -> Result<String, ApiError> {
    validate_id(id)?;
    Ok(format!("/coins/{}", id))
}

/// Path of the market chart endpoint for `id`
pub fn chart_endpoint(id: &str) -> Result<String, ApiError> {
    validate_id(id)?;
    Ok(format!("/coins/{}/market_chart", id))
}

/// Asset ids are interpolated into the path, so they must be a single segment
fn validate_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::InvalidArgument("coin id is empty".to_string()));
    }
    if id.contains(['/', '?', '#']) || id.chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidArgument(format!(
            "coin id '{}' is not a single path segment",
            id
        )));
    }
    Ok(())
}

impl FetchClient {
    /// Top 50 coins by market cap, in upstream order
    pub async fn coins_markets(&self) -> Result<Vec<CoinMarket>, ApiError> {
        self.coins_markets_with_source().await.map(|f| f.data)
    }

    /// Like [`coins_markets`](Self::coins_markets), also reporting where the data came from
    pub async fn coins_markets_with_source(&self) -> Result<Fetched<Vec<CoinMarket>>, ApiError> {
        self.fetch_with_source(MARKETS_ENDPOINT, &markets_params()).await
    }

    /// Full market data for the coin `id`
    pub async fn coin_details(&self, id: &str) -> Result<CoinDetail, ApiError> {
        self.coin_details_with_source(id).await.map(|f| f.data)
    }

    pub async fn coin_details_with_source(
        &self,
        id: &str,
    ) -> Result<Fetched<CoinDetail>, ApiError> {
        let endpoint = coin_endpoint(id)?;
        self.fetch_with_source(&endpoint, &coin_params()).await
    }

    /// Price, market cap and volume history for `id` over the last `days` days
    ///
    /// `days` must be at least 1.
    pub async fn coin_market_chart(
        &self,
        id: &str,
        days: u32,
    ) -> Result<MarketChartData, ApiError> {
        self.coin_market_chart_with_source(id, days)
            .await
            .map(|f| f.data)
    }

    pub async fn coin_market_chart_with_source(
        &self,
        id: &str,
        days: u32,
    ) -> Result<Fetched<MarketChartData>, ApiError> {
        if days == 0 {
            return Err(ApiError::InvalidArgument(
                "days must be a positive integer".to_string(),
            ));
        }
        let endpoint = chart_endpoint(id)?;
        self.fetch_with_source(&endpoint, &chart_params(days)).await
    }
}
