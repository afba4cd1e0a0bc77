//! Provider abstraction for fetching market data from external APIs

use crate::{error::ProviderError, types::MarketListing};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for market data providers
///
/// Implementations fetch USD spot prices and market cap rankings from an
/// external source (CoinGecko, ...). Calls are read-only and never retried
/// here; the sync engine's next tick is the retry.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches USD spot prices for a set of asset ids in a single request
    ///
    /// # Arguments
    /// * `ids` - Asset ids to price
    ///
    /// # Returns
    /// Map of asset id to USD price. Ids unknown upstream are absent from the
    /// map. An empty `ids` slice yields an empty map.
    async fn fetch_spot_prices(&self, ids: &[String])
        -> Result<HashMap<String, f64>, ProviderError>;

    /// Fetches a page of the market listing ranked by market cap descending
    ///
    /// # Arguments
    /// * `count` - Page size
    /// * `page` - 1-based page number
    async fn fetch_top_listings(
        &self,
        count: usize,
        page: u32,
    ) -> Result<Vec<MarketListing>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock provider for testing
    pub struct MockProvider {
        prices: Arc<Mutex<HashMap<String, f64>>>,
        listings: Arc<Mutex<Vec<MarketListing>>>,
        failure: Arc<Mutex<Option<String>>>,
        price_calls: Arc<Mutex<Vec<Vec<String>>>>,
        listing_calls: Arc<Mutex<Vec<(usize, u32)>>>,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                prices: Arc::new(Mutex::new(HashMap::new())),
                listings: Arc::new(Mutex::new(Vec::new())),
                failure: Arc::new(Mutex::new(None)),
                price_calls: Arc::new(Mutex::new(Vec::new())),
                listing_calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn set_price(&self, id: &str, price_usd: f64) {
            self.prices.lock().unwrap().insert(id.to_string(), price_usd);
        }

        pub fn set_listings(&self, listings: Vec<MarketListing>) {
            *self.listings.lock().unwrap() = listings;
        }

        /// Makes every subsequent call fail with an API error
        pub fn set_failure(&self, message: &str) {
            *self.failure.lock().unwrap() = Some(message.to_string());
        }

        pub fn price_calls(&self) -> Vec<Vec<String>> {
            self.price_calls.lock().unwrap().clone()
        }

        pub fn listing_calls(&self) -> Vec<(usize, u32)> {
            self.listing_calls.lock().unwrap().clone()
        }

        fn check_failure(&self) -> Result<(), ProviderError> {
            match self.failure.lock().unwrap().as_ref() {
                Some(message) => Err(ProviderError::ApiError(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_spot_prices(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, f64>, ProviderError> {
            self.price_calls.lock().unwrap().push(ids.to_vec());
            self.check_failure()?;

            let prices = self.prices.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| prices.get(id).map(|price| (id.clone(), *price)))
                .collect())
        }

        async fn fetch_top_listings(
            &self,
            count: usize,
            page: u32,
        ) -> Result<Vec<MarketListing>, ProviderError> {
            self.listing_calls.lock().unwrap().push((count, page));
            self.check_failure()?;

            let listings = self.listings.lock().unwrap();
            let start = (page.saturating_sub(1) as usize) * count;
            Ok(listings.iter().skip(start).take(count).cloned().collect())
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
