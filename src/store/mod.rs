//! Central store service: SQLite persistence, CRUD HTTP surface, and live
//! per-user fan-out of newly created records.

pub mod api;
pub mod records;
pub mod registry;
pub mod websocket;

pub use api::AppState;
pub use records::{RecordStore, StoreError};
pub use registry::SubscriptionRegistry;
pub use websocket::WsAppState;

use crate::config::StoreConfig;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Builds the full store router: CRUD endpoints plus the WebSocket channel,
/// with a permissive CORS layer for the map front-end.
pub fn build_router(records: Arc<RecordStore>, registry: Arc<SubscriptionRegistry>) -> Router {
    let api_state = Arc::new(AppState {
        records,
        registry: Arc::clone(&registry),
    });
    let ws_state = Arc::new(WsAppState { registry });

    api::create_router(api_state)
        .merge(websocket::create_ws_router(ws_state))
        .layer(CorsLayer::permissive())
}

/// Opens the database and serves the store until the process is stopped.
pub async fn run(config: &StoreConfig) -> Result<()> {
    let records = Arc::new(
        RecordStore::new(&config.db_path)
            .with_context(|| format!("Failed to open record store at {}", config.db_path))?,
    );
    let registry = Arc::new(SubscriptionRegistry::new(config.channel_capacity));

    let app = build_router(records, registry);

    info!(addr = %config.bind_addr, db = %config.db_path, "store service starting");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
