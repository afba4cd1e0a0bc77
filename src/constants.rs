//! Constants for the coin price sync service
//!
//! Scheduling, batching and upstream endpoints are centralized here. Only
//! deployment details (port, credentials, base URLs) are read from the
//! environment, see `config`.

/// How often the price refresh job runs (in seconds)
pub const PRICE_REFRESH_INTERVAL_SECS: u64 = 60;

/// How often the listing refresh job runs (in seconds)
pub const LISTING_REFRESH_INTERVAL_SECS: u64 = 600;

/// Maximum number of tracked records read by one price refresh cycle
pub const TRACKED_ASSET_LIMIT: usize = 20;

/// Number of top assets pulled by the listing refresh job
pub const TOP_LISTING_COUNT: usize = 20;

/// Listing page requested by the listing refresh job
pub const TOP_LISTING_PAGE: u32 = 1;

/// Records written per batch by the listing refresh job
pub const LISTING_BATCH_SIZE: usize = 10;

/// HTTP request timeout for outbound calls (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Capacity of the sync event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// CoinGecko API endpoint for ranked market listings
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// Quote currency for every upstream request
pub const VS_CURRENCY: &str = "usd";

/// Airtable REST API base URL
pub const AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Default Airtable table holding asset records
pub const AIRTABLE_TABLE: &str = "coins";

/// Airtable accepts at most this many records per create/update request
pub const AIRTABLE_MAX_BATCH: usize = 10;

/// Page size used when listing Airtable records
pub const AIRTABLE_PAGE_SIZE: usize = 100;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 8000;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-price-sync/0.1.0";
