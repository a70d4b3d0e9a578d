// src/ingest/mod.rs
pub mod extract;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::config::AggregatorConfig;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregator_cache_hits_total",
            "Article page requests served from a fresh cache entry."
        );
        describe_counter!(
            "aggregator_cache_misses_total",
            "Article page requests that triggered an upstream refresh."
        );
        describe_counter!(
            "aggregator_source_errors_total",
            "Refresh cycles where an upstream source failed."
        );
        describe_counter!(
            "aggregator_scrape_failures_total",
            "Static pages that could not be fetched."
        );
        describe_counter!(
            "aggregator_remote_calls_total",
            "Paginated calls issued to the search API."
        );
        describe_histogram!("aggregator_refresh_ms", "Full refresh cycle time in milliseconds.");
        describe_histogram!("aggregator_remote_fetch_ms", "Remote paging loop time in milliseconds.");
        describe_histogram!("aggregator_scrape_ms", "Static scrape fan-out time in milliseconds.");
    });
}

/// Shared outbound client for the search API and static pages.
pub fn build_http_client(cfg: &AggregatorConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("music-news-aggregator/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()?;
    Ok(client)
}
