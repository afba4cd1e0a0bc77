//! Airtable record store implementation

use crate::{
    constants::{
        AIRTABLE_API_URL, AIRTABLE_MAX_BATCH, AIRTABLE_PAGE_SIZE, AIRTABLE_TABLE,
        REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::StoreError,
    record_store::{FieldFilter, Query, RecordStore},
    types::{FieldMap, RecordUpdate, StoreRecord},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A record as returned by the Airtable API
#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: FieldMap,
}

impl From<AirtableRecord> for StoreRecord {
    fn from(record: AirtableRecord) -> Self {
        StoreRecord::new(record.id, record.fields)
    }
}

/// One page of a list request
#[derive(Debug, Deserialize)]
struct ListPage {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

/// Response to create/update requests
#[derive(Debug, Deserialize)]
struct WriteResponse {
    records: Vec<AirtableRecord>,
}

#[derive(Debug, Serialize)]
struct CreateRecord<'a> {
    fields: &'a FieldMap,
}

#[derive(Debug, Serialize)]
struct WriteRequest<T: Serialize> {
    records: T,
}

/// Airtable-backed asset table
pub struct AirtableStore {
    client: Client,
    api_key: String,
    table_url: String,
}

impl AirtableStore {
    /// Creates a store for `table` in base `base_id` on the public API
    pub fn new(api_key: &str, base_id: &str) -> Result<Self, StoreError> {
        Self::with_endpoint(AIRTABLE_API_URL, api_key, base_id, AIRTABLE_TABLE)
    }

    /// Creates a store against a custom API URL and table name
    pub fn with_endpoint(
        api_url: &str,
        api_key: &str,
        base_id: &str,
        table: &str,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(StoreError::Network)?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            table_url: format!("{}/{}/{}", api_url.trim_end_matches('/'), base_id, table),
        })
    }

    /// Builds an Airtable formula matching `{field} = 'value'`
    fn equality_formula(filter: &FieldFilter) -> String {
        let escaped = filter.value.replace('\\', "\\\\").replace('\'', "\\'");
        format!("{{{}}} = '{}'", filter.field, escaped)
    }

    /// Query parameters for one page of a select
    fn select_params(query: &Query, offset: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(filter) = &query.filter {
            params.push(("filterByFormula", Self::equality_formula(filter)));
        }
        for field in &query.fields {
            params.push(("fields[]", field.clone()));
        }
        if let Some(sort) = &query.sort {
            params.push(("sort[0][field]", sort.field.clone()));
            params.push(("sort[0][direction]", sort.direction.as_str().to_string()));
        }
        if let Some(max) = query.max_records {
            params.push(("maxRecords", max.to_string()));
        }
        params.push((
            "pageSize",
            query
                .max_records
                .unwrap_or(AIRTABLE_PAGE_SIZE)
                .clamp(1, AIRTABLE_PAGE_SIZE)
                .to_string(),
        ));
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }

        params
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.api_key)
    }

    /// Sends a request and decodes its JSON body
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(StoreError::Network)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(StoreError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(StoreError::Network)?;
        serde_json::from_str(&body).map_err(|e| {
            StoreError::InvalidResponse(format!(
                "Failed to parse Airtable response: {}. Response: {}",
                e, body
            ))
        })
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn select(&self, query: &Query) -> Result<Vec<StoreRecord>, StoreError> {
        let mut records: Vec<StoreRecord> = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let params = Self::select_params(query, offset.as_deref());
            let page: ListPage = self
                .send(self.client.get(&self.table_url).query(&params))
                .await?;

            records.extend(page.records.into_iter().map(StoreRecord::from));

            let limit_reached = query
                .max_records
                .is_some_and(|max| records.len() >= max);
            match page.offset {
                Some(next) if !limit_reached => offset = Some(next),
                _ => break,
            }
        }

        if let Some(max) = query.max_records {
            records.truncate(max);
        }

        tracing::debug!(
            count = records.len(),
            filtered = query.filter.is_some(),
            "Selected records from Airtable"
        );

        Ok(records)
    }

    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> Result<(), StoreError> {
        for chunk in updates.chunks(AIRTABLE_MAX_BATCH) {
            let response: WriteResponse = self
                .send(
                    self.client
                        .patch(&self.table_url)
                        .json(&WriteRequest { records: chunk }),
                )
                .await?;
            tracing::debug!(count = response.records.len(), "Updated Airtable records");
        }
        Ok(())
    }

    async fn batch_create(&self, records: Vec<FieldMap>) -> Result<Vec<StoreRecord>, StoreError> {
        let mut created = Vec::with_capacity(records.len());

        for chunk in records.chunks(AIRTABLE_MAX_BATCH) {
            let body: Vec<CreateRecord<'_>> =
                chunk.iter().map(|fields| CreateRecord { fields }).collect();
            let response: WriteResponse = self
                .send(
                    self.client
                        .post(&self.table_url)
                        .json(&WriteRequest { records: body }),
                )
                .await?;
            tracing::debug!(count = response.records.len(), "Created Airtable records");
            created.extend(response.records.into_iter().map(StoreRecord::from));
        }

        Ok(created)
    }

    fn store_name(&self) -> &'static str {
        "airtable"
    }
}
