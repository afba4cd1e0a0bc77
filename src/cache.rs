//! In-memory price cache shared by the sync engine and the read API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Interface of the price cache
///
/// Entries never expire: a set overwrites the previous price for the id and
/// the value lives until the process exits.
#[async_trait]
pub trait PriceCache: Send + Sync {
    /// Gets the last observed USD price for an asset
    async fn get(&self, id: &str) -> Option<f64>;

    /// Records a newly observed USD price for an asset
    async fn set(&self, id: &str, price: f64);

    /// Number of cached assets
    async fn len(&self) -> usize;

    /// True when nothing has been cached yet
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// A cached price and when it was observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedPrice {
    /// Price in USD
    pub price_usd: f64,

    /// Last updated timestamp
    pub last_updated: DateTime<Utc>,
}

impl CachedPrice {
    /// Create a cache entry observed now
    pub fn new(price_usd: f64) -> Self {
        Self {
            price_usd,
            last_updated: Utc::now(),
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> std::time::Duration {
        let duration = Utc::now().signed_duration_since(self.last_updated);
        std::time::Duration::from_secs(duration.num_seconds().max(0) as u64)
    }
}

/// Process-local price cache backed by a `HashMap`
#[derive(Default)]
pub struct InMemoryPriceCache {
    prices: RwLock<HashMap<String, CachedPrice>>,
}

impl InMemoryPriceCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the full cache entry for an asset
    pub async fn entry(&self, id: &str) -> Option<CachedPrice> {
        self.prices.read().await.get(id).copied()
    }
}

#[async_trait]
impl PriceCache for InMemoryPriceCache {
    async fn get(&self, id: &str) -> Option<f64> {
        self.entry(id).await.map(|entry| entry.price_usd)
    }

    async fn set(&self, id: &str, price: f64) {
        self.prices
            .write()
            .await
            .insert(id.to_string(), CachedPrice::new(price));
        tracing::debug!(id, price, "Updated cached price");
    }

    async fn len(&self) -> usize {
        self.prices.read().await.len()
    }
}
