use anyhow::Context;
use coin_price_sync::{
    api, telemetry, AirtableStore, CoinGeckoProvider, Config, InMemoryPriceCache, SyncEngine,
};
use std::sync::Arc;

// Timers, handlers and outbound calls share one thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info,tower_http=info");

    let config = Config::from_env().context("loading configuration")?;

    let provider = Arc::new(
        CoinGeckoProvider::with_base_url(&config.coingecko_api_url)
            .context("building CoinGecko client")?,
    );
    let store = Arc::new(
        AirtableStore::with_endpoint(
            &config.airtable_api_url,
            &config.airtable_api_key,
            &config.airtable_base_id,
            &config.airtable_table,
        )
        .context("building Airtable client")?,
    );
    let cache = Arc::new(InMemoryPriceCache::new());

    let engine = SyncEngine::new(provider, store.clone(), cache.clone());
    telemetry::spawn_event_logger(engine.subscribe());
    engine.start();

    let app = api::router(api::AppState::new(store, cache, engine));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Server is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("serving HTTP")?;

    Ok(())
}
