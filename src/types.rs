//! Types for the coin price sync service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field holding the asset's stable external id
pub const FIELD_ID: &str = "id";
/// Field holding the asset's display name
pub const FIELD_NAME: &str = "name";
/// Field holding the ticker symbol
pub const FIELD_SYMBOL: &str = "symbol";
/// Field holding the market capitalization in USD
pub const FIELD_MARKET_CAP: &str = "market_cap";
/// Field holding the last synced USD price
pub const FIELD_CURRENT_PRICE: &str = "currentprice";

/// Field map of a single record, as stored
pub type FieldMap = Map<String, Value>;

/// A row of the asset table as returned by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Store-assigned record key (not the asset id)
    pub key: String,

    /// Field values present on the record
    pub fields: FieldMap,
}

impl StoreRecord {
    /// Create a new store record
    pub fn new(key: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    /// The asset id held in the `id` field, if set
    pub fn asset_id(&self) -> Option<&str> {
        self.fields.get(FIELD_ID).and_then(Value::as_str)
    }

    /// The synced price held in the `currentprice` field, if set
    pub fn current_price(&self) -> Option<f64> {
        self.fields.get(FIELD_CURRENT_PRICE).and_then(Value::as_f64)
    }
}

/// Partial update of one record, addressed by store record key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordUpdate {
    /// Store record key
    #[serde(rename = "id")]
    pub key: String,

    /// Fields to overwrite; fields not listed are left untouched
    pub fields: FieldMap,
}

impl RecordUpdate {
    /// Create an update of a record's `currentprice`
    pub fn current_price(key: impl Into<String>, price: f64) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(FIELD_CURRENT_PRICE.to_string(), Value::from(price));
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// One entry of the upstream ranked market listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    /// Stable asset id (e.g. "bitcoin")
    pub id: String,

    /// Display name
    pub name: String,

    /// Ticker symbol
    pub symbol: String,

    /// Market capitalization in USD
    #[serde(default)]
    pub market_cap: Option<f64>,
}

impl MarketListing {
    /// Fields written when the asset is first created:
    /// exactly `id`, `name`, `symbol` and `market_cap`
    pub fn creation_fields(&self) -> FieldMap {
        let mut fields = self.detail_fields();
        fields.insert(FIELD_ID.to_string(), Value::from(self.id.clone()));
        fields
    }

    /// Fields refreshed on an asset that already exists
    pub fn detail_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(FIELD_NAME.to_string(), Value::from(self.name.clone()));
        fields.insert(FIELD_SYMBOL.to_string(), Value::from(self.symbol.clone()));
        fields.insert(
            FIELD_MARKET_CAP.to_string(),
            self.market_cap.map(Value::from).unwrap_or(Value::Null),
        );
        fields
    }
}

/// The two scheduled jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJob {
    /// Refreshes `currentprice` of tracked assets
    PriceRefresh,
    /// Upserts the top market cap listing
    ListingRefresh,
}

impl SyncJob {
    /// Get the job name
    pub fn name(&self) -> &'static str {
        match self {
            SyncJob::PriceRefresh => "price_refresh",
            SyncJob::ListingRefresh => "listing_refresh",
        }
    }
}

impl std::fmt::Display for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters describing what one sync cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Items received from upstream (prices or listings)
    pub fetched: usize,
    /// Cache entries written
    pub cached: usize,
    /// Records updated in the store
    pub updated: usize,
    /// Records created in the store
    pub created: usize,
    /// Upstream ids with no matching store record
    pub unmatched: usize,
    /// Records whose store write failed
    pub failed_writes: usize,
}

/// Outcome events emitted by the sync engine, one per cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEvent {
    /// The cycle ran to completion
    CycleCompleted {
        id: Uuid,
        job: SyncJob,
        duration_ms: u64,
        report: SyncReport,
        timestamp: DateTime<Utc>,
    },

    /// The cycle was abandoned or some of its writes failed
    CycleFailed {
        id: Uuid,
        job: SyncJob,
        duration_ms: u64,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            SyncEvent::CycleCompleted { id, .. } => *id,
            SyncEvent::CycleFailed { id, .. } => *id,
        }
    }

    /// Get the job the event belongs to
    pub fn job(&self) -> SyncJob {
        match self {
            SyncEvent::CycleCompleted { job, .. } => *job,
            SyncEvent::CycleFailed { job, .. } => *job,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::CycleCompleted { .. } => "CYCLE_COMPLETED",
            SyncEvent::CycleFailed { .. } => "CYCLE_FAILED",
        }
    }

    /// True for a completed cycle
    pub fn is_success(&self) -> bool {
        matches!(self, SyncEvent::CycleCompleted { .. })
    }
}

impl std::fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEvent::CycleCompleted {
                job,
                duration_ms,
                report,
                ..
            } => write!(
                f,
                "{} completed in {}ms: fetched={} updated={} created={}",
                job, duration_ms, report.fetched, report.updated, report.created
            ),
            SyncEvent::CycleFailed {
                job, error_message, ..
            } => write!(f, "{} failed: {}", job, error_message),
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Both jobs are succeeding
    Healthy,
    /// A job's most recent cycles are failing
    Degraded,
    /// Nothing has been synced yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_fields_are_exactly_the_listing_columns() {
        let listing = MarketListing {
            id: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            symbol: "btc".to_string(),
            market_cap: Some(1.0e12),
        };

        let fields = listing.creation_fields();
        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();

        assert_eq!(keys, vec!["id", "market_cap", "name", "symbol"]);
        assert_eq!(fields["id"], json!("bitcoin"));
        assert!(!listing.detail_fields().contains_key(FIELD_ID));
    }

    #[test]
    fn test_store_record_accessors() {
        let fields = json!({"id": "ethereum", "currentprice": 3000.5})
            .as_object()
            .cloned()
            .unwrap();
        let record = StoreRecord::new("rec1", fields);

        assert_eq!(record.asset_id(), Some("ethereum"));
        assert_eq!(record.current_price(), Some(3000.5));

        let empty = StoreRecord::new("rec2", FieldMap::new());
        assert_eq!(empty.asset_id(), None);
        assert_eq!(empty.current_price(), None);
    }

    #[test]
    fn test_sync_event_serializes_with_type_tag() {
        let event = SyncEvent::CycleFailed {
            id: Uuid::new_v4(),
            job: SyncJob::PriceRefresh,
            duration_ms: 12,
            error_message: "boom".to_string(),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "CYCLE_FAILED");
        assert_eq!(value["job"], "price_refresh");
        assert!(!event.is_success());
        assert_eq!(event.event_type(), "CYCLE_FAILED");
    }
}
