//! # Coin Price Sync
//!
//! Polls CoinGecko for the top assets by market cap and their USD spot
//! prices, keeps them in an Airtable table, and serves them over HTTP from an
//! in-memory cache.
//!
//! ## Architecture
//!
//! ```text
//! SyncEngine (price refresh 60s, listing refresh 600s)
//!     ↓
//! MarketDataProvider (CoinGecko)
//!     ↓
//! PriceCache (in-memory) + RecordStore (Airtable)
//!     ↑
//! Read API: GET /coins, GET /coins/price/:id
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use coin_price_sync::{
//!     api, AirtableStore, CoinGeckoProvider, InMemoryPriceCache, SyncEngine,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(CoinGeckoProvider::new()?);
//! let store = Arc::new(AirtableStore::new("key", "appBase")?);
//! let cache = Arc::new(InMemoryPriceCache::new());
//!
//! let engine = SyncEngine::new(provider, store.clone(), cache.clone());
//! engine.start();
//!
//! let app = api::router(api::AppState::new(store, cache, engine));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod record_store;
pub mod record_stores;
pub mod sync;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use cache::{InMemoryPriceCache, PriceCache};
pub use config::Config;
pub use error::{ConfigError, LookupError, ProviderError, StoreError, SyncError};
pub use metrics::JobMetrics;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoProvider;
pub use record_store::{Query, RecordStore};
pub use record_stores::AirtableStore;
pub use sync::SyncEngine;
pub use types::{
    ComponentHealth, HealthStatus, MarketListing, RecordUpdate, StoreRecord, SyncEvent, SyncJob,
    SyncReport,
};
