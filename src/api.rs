//! HTTP read API over the asset table and the price cache

use crate::{
    cache::PriceCache,
    error::{LookupError, StoreError},
    record_store::RecordStore,
    sync::SyncEngine,
    types::{ComponentHealth, FieldMap, HealthStatus, FIELD_CURRENT_PRICE, FIELD_ID},
};
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// ---------- App State ----------
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn PriceCache>,
    engine: SyncEngine,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn PriceCache>,
        engine: SyncEngine,
    ) -> Self {
        Self {
            store,
            cache,
            engine,
        }
    }
}

/// Body of a price lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub id: String,
    /// `null` while the record has not been priced yet
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Request-path failures, rendered as `{"error": "..."}`
///
/// The message is all a client sees; the cause is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Internal server error")]
    CoinsUnavailable(#[source] StoreError),

    #[error("Internal Server Error")]
    PriceUnavailable(#[source] StoreError),

    #[error("Coin not found")]
    CoinNotFound,
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound { .. } => ApiError::CoinNotFound,
            LookupError::Store(e) => ApiError::PriceUnavailable(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::CoinsUnavailable(e) => {
                tracing::error!(error = %e, "Error listing coins from the store");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::PriceUnavailable(e) => {
                tracing::error!(error = %e, "Error fetching coin price from the store");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::CoinNotFound => StatusCode::NOT_FOUND,
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Resolves a coin's price, cache first
///
/// On a cache miss the store is queried and a found price is cached. A record
/// that exists but has no price yet resolves to `None` and is not cached.
pub async fn resolve_price(
    store: &dyn RecordStore,
    cache: &dyn PriceCache,
    id: &str,
) -> Result<Option<f64>, LookupError> {
    if let Some(price) = cache.get(id).await {
        return Ok(Some(price));
    }

    let records = store
        .query_by_field(FIELD_ID, id, &[FIELD_CURRENT_PRICE], 1)
        .await?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::not_found(id))?;

    let price = record.current_price();
    if let Some(price) = price {
        cache.set(id, price).await;
    }

    Ok(price)
}

// ---------- Handlers ----------

async fn list_coins(State(state): State<AppState>) -> Result<Json<Vec<FieldMap>>, ApiError> {
    let records = state
        .store
        .list_all()
        .await
        .map_err(ApiError::CoinsUnavailable)?;

    Ok(Json(records.into_iter().map(|r| r.fields).collect()))
}

async fn coin_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let price = resolve_price(state.store.as_ref(), state.cache.as_ref(), &id).await?;
    Ok(Json(PriceResponse { id, price }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<ComponentHealth>) {
    let health = state.engine.health_check().await;
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(health))
}

/// Builds the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/coins", get(list_coins))
        .route("/coins/price/:id", get(coin_price))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
