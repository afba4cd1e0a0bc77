//! Error types for the coin price sync service

use crate::types::SyncReport;
use thiserror::Error;

/// Errors that can occur when fetching data from the market data provider
///
/// Every variant means the upstream is unavailable for this cycle.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),
}

/// Errors returned by the record store
///
/// Every variant means the store is unavailable for this call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure talking to the store
    #[error("Store network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Store throttled the request
    #[error("Store rate limit exceeded")]
    RateLimitExceeded,

    /// Store rejected the request (auth, unknown table, bad field, ...)
    #[error("Store API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Store answered with a body we could not decode
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

/// Errors that can occur when resolving the price of a single coin
#[derive(Debug, Error)]
pub enum LookupError {
    /// No record with this id exists in the store
    #[error("Coin not found: {id}")]
    NotFound { id: String },

    /// The store could not be queried
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LookupError {
    /// Creates a NotFound error
    pub fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}

/// Errors that end a sync cycle
#[derive(Debug, Error)]
pub enum SyncError {
    /// Market data could not be fetched; nothing was written
    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] ProviderError),

    /// The record store could not be read
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    /// Some store writes failed; the rest of the cycle was applied
    #[error("{failed} store write(s) failed")]
    PartialWrite { failed: usize, report: SyncReport },
}

/// Errors raised while loading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
