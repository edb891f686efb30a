use std::sync::Arc;

use cheheom_api::config::{AppConfig, StoreBackend};
use cheheom_api::{build_router, AppState};
use cheheom_shared::clients::kv::KvStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cheheom_shared::middleware::init_tracing("cheheom-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let store = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            KvStore::memory()
        }
        StoreBackend::Redis => KvStore::redis(&config.redis_url).await?,
    };

    let metrics_handle = match cheheom_shared::middleware::init_metrics("cheheom-api") {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let state = Arc::new(AppState { config, store, metrics_handle });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "cheheom-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
