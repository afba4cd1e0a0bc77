//! Record store abstraction over the external asset table

use crate::{
    error::StoreError,
    types::{FieldMap, RecordUpdate, StoreRecord},
};
use async_trait::async_trait;

/// Equality filter on a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

/// Sort direction for a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Ordering applied before `max_records`
#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// A select over the asset table
///
/// The default query returns every record with every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Only return records whose field equals the value
    pub filter: Option<FieldFilter>,
    /// Fields to return; empty means all fields
    pub fields: Vec<String>,
    /// Upper bound on the number of records returned
    pub max_records: Option<usize>,
    /// Order of the returned records; store order when unset
    pub sort: Option<SortOrder>,
}

impl Query {
    /// Query every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to records whose `field` equals `value`
    pub fn filter(mut self, field: &str, value: &str) -> Self {
        self.filter = Some(FieldFilter {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Return only the given fields
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Return at most `max` records
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Order by `field`, largest first; records missing it come last
    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort = Some(SortOrder {
            field: field.to_string(),
            direction: SortDirection::Desc,
        });
        self
    }
}

/// Trait for the persistent asset table
///
/// Writes are not retried within a call: a failure surfaces as a
/// `StoreError` and the caller relies on its next cycle.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs a select and returns matching records (possibly none)
    async fn select(&self, query: &Query) -> Result<Vec<StoreRecord>, StoreError>;

    /// Applies partial field updates, addressed by store record key
    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> Result<(), StoreError>;

    /// Inserts new records and returns them as stored
    async fn batch_create(&self, records: Vec<FieldMap>) -> Result<Vec<StoreRecord>, StoreError>;

    /// Returns the name of this store
    fn store_name(&self) -> &'static str;

    /// Returns every record with every field
    async fn list_all(&self) -> Result<Vec<StoreRecord>, StoreError> {
        self.select(&Query::all()).await
    }

    /// Looks up records whose `field` equals `value`
    ///
    /// # Arguments
    /// * `field` - Field to match on
    /// * `value` - Value the field must equal
    /// * `fields_to_return` - Projection; empty means all fields
    /// * `max_records` - Upper bound on returned records
    ///
    /// # Returns
    /// Matching records; an empty vector when nothing matches
    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
        fields_to_return: &[&str],
        max_records: usize,
    ) -> Result<Vec<StoreRecord>, StoreError> {
        let query = Query::all()
            .filter(field, value)
            .fields(fields_to_return)
            .max_records(max_records);
        self.select(&query).await
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockRecordStore;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let query = Query::all()
            .filter("id", "bitcoin")
            .fields(&["currentprice"])
            .max_records(1);

        assert_eq!(
            query.filter,
            Some(FieldFilter {
                field: "id".to_string(),
                value: "bitcoin".to_string()
            })
        );
        assert_eq!(query.fields, vec!["currentprice".to_string()]);
        assert_eq!(query.max_records, Some(1));
        assert_eq!(query.sort, None);
        assert_eq!(Query::all(), Query::default());

        let ranked = Query::all().sort_desc("market_cap");
        assert_eq!(
            ranked.sort,
            Some(SortOrder {
                field: "market_cap".to_string(),
                direction: SortDirection::Desc,
            })
        );
    }

    #[tokio::test]
    async fn test_query_by_field_returns_empty_on_no_match() {
        let store = MockRecordStore::new();
        store.insert(json!({"id": "bitcoin", "currentprice": 50000.0}));

        let found = store
            .query_by_field("id", "dogecoin", &["currentprice"], 1)
            .await
            .unwrap();
        assert!(found.is_empty());

        let found = store
            .query_by_field("id", "bitcoin", &["currentprice"], 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].current_price(), Some(50000.0));
        assert_eq!(found[0].asset_id(), None);
    }

    #[tokio::test]
    async fn test_list_all_uses_unfiltered_select() {
        let store = MockRecordStore::new();
        store.insert(json!({"id": "bitcoin"}));
        store.insert(json!({"id": "ethereum"}));

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.selects(), vec![Query::all()]);
    }

    #[tokio::test]
    async fn test_sorted_select_puts_largest_first_and_missing_last() {
        let store = MockRecordStore::new();
        store.insert(json!({"id": "small", "market_cap": 10.0}));
        store.insert(json!({"id": "unranked"}));
        store.insert(json!({"id": "large", "market_cap": 1000.0}));
        store.insert(json!({"id": "medium", "market_cap": 100.0}));

        let records = store
            .select(&Query::all().sort_desc("market_cap").max_records(3))
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().filter_map(|r| r.asset_id()).collect();
        assert_eq!(ids, vec!["large", "medium", "small"]);
    }
}
