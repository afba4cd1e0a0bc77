//! CoinGecko market data provider implementation

use crate::{
    constants::{
        COINGECKO_API_URL, COINGECKO_MARKETS_ENDPOINT, COINGECKO_SIMPLE_PRICE_ENDPOINT,
        REQUEST_TIMEOUT_SECS, USER_AGENT, VS_CURRENCY,
    },
    error::ProviderError,
    provider::MarketDataProvider,
    types::MarketListing,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, CoinGeckoPriceData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPriceData {
    usd: Option<f64>,
}

/// CoinGecko market data provider
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider against the public API
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(COINGECKO_API_URL)
    }

    /// Creates a new CoinGecko provider against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn simple_price_url(&self) -> String {
        format!("{}{}", self.base_url, COINGECKO_SIMPLE_PRICE_ENDPOINT)
    }

    fn markets_url(&self) -> String {
        format!("{}{}", self.base_url, COINGECKO_MARKETS_ENDPOINT)
    }

    /// Query parameters for a simple price request
    fn simple_price_params(ids: &[String]) -> Vec<(&'static str, String)> {
        vec![
            ("ids", ids.join(",")),
            ("vs_currencies", VS_CURRENCY.to_string()),
        ]
    }

    /// Query parameters for a ranked markets request
    fn markets_params(count: usize, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", VS_CURRENCY.to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", count.to_string()),
            ("page", page.to_string()),
        ]
    }

    /// Parses the CoinGecko response into a price map
    ///
    /// Entries without a USD quote are dropped.
    fn parse_prices(response: CoinGeckoResponse) -> HashMap<String, f64> {
        response
            .prices
            .into_iter()
            .filter_map(|(id, data)| data.usd.map(|price| (id, price)))
            .collect()
    }

    /// Checks the status and decodes the JSON body
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse CoinGecko response: {}. Response: {}",
                e, response_text
            ))
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_spot_prices(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, f64>, ProviderError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(count = ids.len(), "Fetching spot prices from CoinGecko");

        let response = self
            .client
            .get(self.simple_price_url())
            .query(&Self::simple_price_params(ids))
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        let prices = Self::parse_prices(Self::decode(response).await?);

        tracing::debug!(count = prices.len(), "Fetched spot prices from CoinGecko");

        Ok(prices)
    }

    async fn fetch_top_listings(
        &self,
        count: usize,
        page: u32,
    ) -> Result<Vec<MarketListing>, ProviderError> {
        tracing::debug!(count, page, "Fetching market listing from CoinGecko");

        let response = self
            .client
            .get(self.markets_url())
            .query(&Self::markets_params(count, page))
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        Self::decode(response).await
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_price_params() {
        let ids = vec!["bitcoin".to_string(), "ethereum".to_string()];
        let params = CoinGeckoProvider::simple_price_params(&ids);

        assert_eq!(params[0], ("ids", "bitcoin,ethereum".to_string()));
        assert_eq!(params[1], ("vs_currencies", "usd".to_string()));
    }

    #[test]
    fn test_markets_params() {
        let params = CoinGeckoProvider::markets_params(20, 1);

        assert!(params.contains(&("order", "market_cap_desc".to_string())));
        assert!(params.contains(&("per_page", "20".to_string())));
        assert!(params.contains(&("page", "1".to_string())));
        assert!(params.contains(&("vs_currency", "usd".to_string())));
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let provider = CoinGeckoProvider::with_base_url("http://localhost:9999/api/v3/").unwrap();

        assert_eq!(
            provider.simple_price_url(),
            "http://localhost:9999/api/v3/simple/price"
        );
        assert_eq!(
            provider.markets_url(),
            "http://localhost:9999/api/v3/coins/markets"
        );
    }

    #[test]
    fn test_parse_prices_drops_missing_quotes() {
        let body = r#"{"bitcoin":{"usd":50000.0},"ethereum":{"usd":3000},"ghost":{}}"#;
        let response: CoinGeckoResponse = serde_json::from_str(body).unwrap();
        let prices = CoinGeckoProvider::parse_prices(response);

        assert_eq!(prices.len(), 2);
        assert_eq!(prices["bitcoin"], 50000.0);
        assert_eq!(prices["ethereum"], 3000.0);
    }

    #[test]
    fn test_listing_decodes_market_rows() {
        let body = r#"[
            {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":50000,"market_cap":980000000000,"market_cap_rank":1},
            {"id":"obscure","symbol":"obs","name":"Obscure","market_cap":null}
        ]"#;
        let listings: Vec<MarketListing> = serde_json::from_str(body).unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "bitcoin");
        assert_eq!(listings[0].market_cap, Some(980000000000.0));
        assert_eq!(listings[1].market_cap, None);
    }

    #[tokio::test]
    async fn test_empty_id_set_skips_request() {
        // Unroutable base URL: any request would fail
        let provider = CoinGeckoProvider::with_base_url("http://127.0.0.1:1").unwrap();
        let prices = provider.fetch_spot_prices(&[]).await.unwrap();

        assert!(prices.is_empty());
    }
}
