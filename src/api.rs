use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            USER_AGENT,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::device::DeviceClass;
use crate::engine::{AggregationEngine, PageRequest, INVALID_PAGINATION};

pub const ALLOW_METHODS: &str = "GET, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AggregationEngine>,
    allowed_origin: HeaderValue,
}

impl AppState {
    pub fn new(engine: Arc<AggregationEngine>, allowed_origin: &str) -> anyhow::Result<Self> {
        let allowed_origin = HeaderValue::from_str(allowed_origin)
            .map_err(|e| anyhow::anyhow!("invalid allowed origin {allowed_origin:?}: {e}"))?;
        Ok(Self {
            engine,
            allowed_origin,
        })
    }
}

/// `/articles` plus the legacy `/api/interview-column` path, both with fixed CORS headers.
pub fn router(state: AppState) -> Router {
    let articles = Router::new()
        .route("/articles", get(get_articles).options(preflight))
        .route("/api/interview-column", get(get_articles).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            state.allowed_origin.clone(),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(articles)
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let req = match PageRequest::parse(
        q.get("page").map(String::as_str),
        q.get("pageSize").map(String::as_str),
    ) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejecting article request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_PAGINATION })),
            )
                .into_response();
        }
    };

    let ua = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let device = DeviceClass::from_user_agent(ua);

    let page = state.engine.get_page(device, req, Utc::now()).await;
    let status =
        StatusCode::from_u16(page.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    info!(
        device = device.as_str(),
        page = req.page(),
        page_size = req.page_size(),
        returned = page.articles.len(),
        total = page.total_count,
        status = status.as_u16(),
        "articles served"
    );

    let cache = if page.cache_hit { "HIT" } else { "MISS" };
    (status, [("X-Cache", cache)], Json(page)).into_response()
}
