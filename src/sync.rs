//! Sync engine: the scheduled price and listing refresh jobs
//!
//! ```text
//! SyncEngine::start()
//!     ↓
//! listing refresh (once) → price loop (60s) + listing loop (600s)
//!     ↓
//! MarketDataProvider (CoinGecko)
//!     ↓
//! PriceCache + RecordStore (Airtable)
//!     ↓
//! SyncEvent broadcast + per-job metrics
//! ```

use crate::{
    cache::PriceCache,
    constants::{
        EVENT_CHANNEL_CAPACITY, LISTING_BATCH_SIZE, LISTING_REFRESH_INTERVAL_SECS,
        PRICE_REFRESH_INTERVAL_SECS, TOP_LISTING_COUNT, TOP_LISTING_PAGE, TRACKED_ASSET_LIMIT,
    },
    error::SyncError,
    metrics::{JobMetrics, MetricsCollector},
    provider::MarketDataProvider,
    record_store::{Query, RecordStore},
    types::{
        ComponentHealth, FieldMap, HealthStatus, MarketListing, RecordUpdate, StoreRecord,
        SyncEvent, SyncJob, SyncReport, FIELD_ID, FIELD_MARKET_CAP,
    },
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

/// Maps asset ids to the store record keys holding them
///
/// Built once per cycle from a table snapshot. An id may map to several keys
/// when the table holds duplicate rows for it.
#[derive(Debug, Default)]
struct RecordIndex {
    ids: Vec<String>,
    keys: HashMap<String, Vec<String>>,
}

impl RecordIndex {
    fn build(records: &[StoreRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            let Some(id) = record.asset_id() else {
                continue;
            };
            let keys = index.keys.entry(id.to_string()).or_default();
            if keys.is_empty() {
                index.ids.push(id.to_string());
            }
            keys.push(record.key.clone());
        }
        index
    }

    fn keys_for(&self, id: &str) -> Option<&[String]> {
        self.keys.get(id).map(Vec::as_slice)
    }

    fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Runs the price and listing refresh jobs
///
/// Cloning is cheap; clones share the provider, store, cache, metrics and
/// event channel.
#[derive(Clone)]
pub struct SyncEngine {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn PriceCache>,
    price_metrics: Arc<MetricsCollector>,
    listing_metrics: Arc<MetricsCollector>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Creates a new engine over the given collaborators
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn PriceCache>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            store,
            cache,
            price_metrics: Arc::new(MetricsCollector::new(SyncJob::PriceRefresh)),
            listing_metrics: Arc::new(MetricsCollector::new(SyncJob::ListingRefresh)),
            events,
        }
    }

    /// Subscribes to cycle outcome events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Starts the background scheduler
    ///
    /// The listing refresh runs once before either loop starts so the first
    /// price refresh sees a populated table. Afterwards the two jobs run on
    /// independent timers. Aborting the returned handle stops both jobs.
    pub fn start(&self) -> JoinHandle<()> {
        let engine = self.clone();

        tokio::spawn(async move {
            tracing::info!(
                price_interval_secs = PRICE_REFRESH_INTERVAL_SECS,
                listing_interval_secs = LISTING_REFRESH_INTERVAL_SECS,
                provider = engine.provider.provider_name(),
                store = engine.store.store_name(),
                "Starting sync engine"
            );

            // Outcomes are reported through events and metrics
            let _ = engine.refresh_listings_now().await;

            // Both loops live in this task so aborting the handle stops them
            tokio::join!(
                engine.clone().run_every(
                    SyncJob::PriceRefresh,
                    Duration::from_secs(PRICE_REFRESH_INTERVAL_SECS),
                    false,
                ),
                engine.run_every(
                    SyncJob::ListingRefresh,
                    Duration::from_secs(LISTING_REFRESH_INTERVAL_SECS),
                    true,
                ),
            );
        })
    }

    async fn run_every(self, job: SyncJob, period: Duration, delay_first: bool) {
        if delay_first {
            sleep(period).await;
        }
        loop {
            let _ = self.run_cycle(job).await;
            sleep(period).await;
        }
    }

    /// Runs one price refresh cycle immediately
    pub async fn refresh_prices_now(&self) -> Result<SyncReport, SyncError> {
        self.run_cycle(SyncJob::PriceRefresh).await
    }

    /// Runs one listing refresh cycle immediately
    pub async fn refresh_listings_now(&self) -> Result<SyncReport, SyncError> {
        self.run_cycle(SyncJob::ListingRefresh).await
    }

    /// Runs a cycle, records its metrics and broadcasts its outcome
    async fn run_cycle(&self, job: SyncJob) -> Result<SyncReport, SyncError> {
        let start = Instant::now();

        let result = match job {
            SyncJob::PriceRefresh => self.refresh_prices().await,
            SyncJob::ListingRefresh => self.refresh_listings().await,
        };

        let elapsed = start.elapsed();
        let metrics = match job {
            SyncJob::PriceRefresh => &self.price_metrics,
            SyncJob::ListingRefresh => &self.listing_metrics,
        };
        metrics.record_cycle(elapsed, result.is_ok()).await;

        let duration_ms = elapsed.as_millis() as u64;
        let event = match &result {
            Ok(report) => SyncEvent::CycleCompleted {
                id: Uuid::new_v4(),
                job,
                duration_ms,
                report: *report,
                timestamp: Utc::now(),
            },
            Err(e) => SyncEvent::CycleFailed {
                id: Uuid::new_v4(),
                job,
                duration_ms,
                error_message: e.to_string(),
                timestamp: Utc::now(),
            },
        };
        // No subscribers is fine
        let _ = self.events.send(event);

        result
    }

    /// Fetches spot prices for tracked assets into the cache and the store
    ///
    /// Tracked assets are the rows with the largest market cap, so the
    /// snapshot follows the latest listing as coins enter and leave it.
    async fn refresh_prices(&self) -> Result<SyncReport, SyncError> {
        let query = Query::all()
            .fields(&[FIELD_ID])
            .sort_desc(FIELD_MARKET_CAP)
            .max_records(TRACKED_ASSET_LIMIT);
        let records = self.store.select(&query).await?;
        let index = RecordIndex::build(&records);

        let mut report = SyncReport::default();
        if index.is_empty() {
            tracing::debug!("No tracked assets yet, skipping price refresh");
            return Ok(report);
        }

        // An upstream failure abandons the cycle before anything is written
        let prices = self.provider.fetch_spot_prices(&index.ids).await?;
        report.fetched = prices.len();

        let mut prices: Vec<(String, f64)> = prices.into_iter().collect();
        prices.sort_by(|a, b| a.0.cmp(&b.0));

        for (id, price) in prices {
            self.cache.set(&id, price).await;
            report.cached += 1;

            let Some(keys) = index.keys_for(&id) else {
                tracing::warn!(id = %id, "Price returned for an asset with no table record");
                report.unmatched += 1;
                continue;
            };

            let updates: Vec<RecordUpdate> = keys
                .iter()
                .map(|key| RecordUpdate::current_price(key.clone(), price))
                .collect();
            match self.store.batch_update(updates).await {
                Ok(()) => report.updated += keys.len(),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Failed to store current price");
                    report.failed_writes += keys.len();
                }
            }
        }

        if report.failed_writes > 0 {
            return Err(SyncError::PartialWrite {
                failed: report.failed_writes,
                report,
            });
        }
        Ok(report)
    }

    /// Upserts the top market cap listing into the store
    async fn refresh_listings(&self) -> Result<SyncReport, SyncError> {
        let listings = self
            .provider
            .fetch_top_listings(TOP_LISTING_COUNT, TOP_LISTING_PAGE)
            .await?;

        let existing = self.store.select(&Query::all().fields(&[FIELD_ID])).await?;
        let index = RecordIndex::build(&existing);

        let mut report = SyncReport {
            fetched: listings.len(),
            ..SyncReport::default()
        };

        let mut queued: HashSet<&str> = HashSet::new();
        let ranked: Vec<&MarketListing> = listings
            .iter()
            .filter(|listing| queued.insert(listing.id.as_str()))
            .collect();

        // Each rank window goes out before the next one
        for window in ranked.chunks(LISTING_BATCH_SIZE) {
            let mut updates: Vec<RecordUpdate> = Vec::new();
            let mut creates: Vec<FieldMap> = Vec::new();
            for listing in window {
                match index.keys_for(&listing.id) {
                    Some(keys) => updates.extend(keys.iter().map(|key| RecordUpdate {
                        key: key.clone(),
                        fields: listing.detail_fields(),
                    })),
                    None => creates.push(listing.creation_fields()),
                }
            }

            for batch in updates.chunks(LISTING_BATCH_SIZE) {
                match self.store.batch_update(batch.to_vec()).await {
                    Ok(()) => report.updated += batch.len(),
                    Err(e) => {
                        tracing::warn!(count = batch.len(), error = %e, "Failed to update listing batch");
                        report.failed_writes += batch.len();
                    }
                }
            }

            if !creates.is_empty() {
                let count = creates.len();
                match self.store.batch_create(creates).await {
                    Ok(created) => report.created += created.len(),
                    Err(e) => {
                        tracing::warn!(count, error = %e, "Failed to create listing batch");
                        report.failed_writes += count;
                    }
                }
            }
        }

        if report.failed_writes > 0 {
            return Err(SyncError::PartialWrite {
                failed: report.failed_writes,
                report,
            });
        }
        Ok(report)
    }

    /// Gets metrics for one job
    pub async fn job_metrics(&self, job: SyncJob) -> JobMetrics {
        match job {
            SyncJob::PriceRefresh => self.price_metrics.get_metrics().await,
            SyncJob::ListingRefresh => self.listing_metrics.get_metrics().await,
        }
    }

    /// Perform a health check on the sync engine
    ///
    /// # Returns
    /// ComponentHealth indicating the status of both jobs
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = HashMap::new();

        let price = self.job_metrics(SyncJob::PriceRefresh).await;
        let listing = self.job_metrics(SyncJob::ListingRefresh).await;

        details.insert(
            "cached_prices".to_string(),
            serde_json::json!(self.cache.len().await),
        );
        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider.provider_name()),
        );
        details.insert(
            "store_name".to_string(),
            serde_json::json!(self.store.store_name()),
        );

        let failing: Vec<&str> = [&price, &listing]
            .iter()
            .filter(|m| m.consecutive_failures > 0)
            .map(|m| m.job.name())
            .collect();

        let status = if price.last_success.is_none() && listing.last_success.is_none() {
            HealthStatus::Unhealthy
        } else if !failing.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Sync jobs are succeeding".to_string(),
            HealthStatus::Degraded => format!("Failing jobs: {}", failing.join(", ")),
            HealthStatus::Unhealthy => "No sync cycle has succeeded yet".to_string(),
        };

        details.insert(price.job.name().to_string(), serde_json::json!(price));
        details.insert(listing.job.name().to_string(), serde_json::json!(listing));

        ComponentHealth {
            name: "sync_engine".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}
