// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod article;
pub mod cache;
pub mod config;
pub mod device;
pub mod engine;
pub mod ingest;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::article::{ArticleRecord, SourceType};
pub use crate::config::AggregatorConfig;
pub use crate::device::DeviceClass;
pub use crate::engine::{AggregatedPage, AggregationEngine, PageRequest};

/// `/metrics` is only mounted when `DEBUG_ROUTES=1`.
fn debug_routes_enabled() -> bool {
    std::env::var("DEBUG_ROUTES").ok().as_deref() == Some("1")
}

/// Build the full application router from environment/file configuration.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AggregatorConfig::load_default()?;
    app_with_config(&cfg)
}

pub fn app_with_config(cfg: &AggregatorConfig) -> anyhow::Result<Router> {
    info!(
        origin = %cfg.allowed_origin,
        fetch_limit = cfg.fetch_limit,
        ttl_secs = cfg.cache_ttl_secs,
        static_urls = %cfg.static_urls_path.display(),
        "aggregator config loaded"
    );
    let engine = Arc::new(AggregationEngine::from_config(cfg)?);
    let state = AppState::new(engine, &cfg.allowed_origin)?;
    let mut app = api::router(state);

    if debug_routes_enabled() {
        if let Some(m) = telemetry::Metrics::init() {
            app = app.merge(m.router());
        }
    }
    Ok(app)
}
