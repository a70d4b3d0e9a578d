//! # Aggregation Engine
//! Serves paginated slices of the merged article list for one device class.
//!
//! On a cache miss the remote search fetch and the static scrape path run
//! concurrently; each side's failure is captured on its own and never aborts
//! the other. Survivors are merged, de-duplicated by URL, stable-sorted
//! newest-first and stored in the cache (partial results included).

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::article::ArticleRecord;
use crate::cache::{ArticleCache, CacheEntry};
use crate::config::{AggregatorConfig, StaticUrlFile};
use crate::device::DeviceClass;
use crate::ingest::providers::remote_search::{RemoteArticleFetcher, SearchApiClient};
use crate::ingest::providers::static_page::{HttpPageFetcher, StaticArticleScraper};
use crate::ingest::types::{RemoteSource, StaticUrlProvider};
use crate::ingest::{build_http_client, ensure_metrics_described};

pub const REMOTE_FETCH_ERROR: &str = "Failed to fetch remote articles.";
pub const STATIC_CONFIG_ERROR: &str = "Failed to read static article configuration.";
pub const STATIC_SCRAPE_ERROR: &str = "Failed to scrape static articles.";
pub const INVALID_PAGINATION: &str = "Invalid page or pageSize parameters.";

/// Validated 1-based pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self> {
        if page < 1 || page_size < 1 {
            anyhow::bail!("{INVALID_PAGINATION} page={page} pageSize={page_size}");
        }
        Ok(Self {
            page: usize::try_from(page).unwrap_or(usize::MAX),
            page_size: usize::try_from(page_size).unwrap_or(usize::MAX),
        })
    }

    /// Both values must be present and parse as integers.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Result<Self> {
        let parse = |name: &str, raw: Option<&str>| -> Result<i64> {
            let raw = raw.ok_or_else(|| anyhow::anyhow!("missing {name}"))?;
            raw.trim()
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("{name}={raw:?}: {e}"))
        };
        Self::new(parse("page", page)?, parse("pageSize", page_size)?)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Half-open `[start, end)` into the merged list.
    pub fn bounds(&self) -> (usize, usize) {
        let start = (self.page - 1).saturating_mul(self.page_size);
        (start, start.saturating_add(self.page_size))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregatedPage {
    pub articles: Vec<ArticleRecord>,
    pub total_count: usize,
    pub error: Option<String>,
    #[serde(skip)]
    pub cache_hit: bool,
}

impl AggregatedPage {
    /// 200, or 500 when any source failed (articles may still be non-empty).
    pub fn http_status(&self) -> u16 {
        if self.error.is_some() {
            500
        } else {
            200
        }
    }
}

/// Outcome of one source during a refresh.
#[derive(Debug, Default)]
struct SourceOutcome {
    articles: Vec<ArticleRecord>,
    error: Option<&'static str>,
}

impl SourceOutcome {
    fn ok(articles: Vec<ArticleRecord>) -> Self {
        Self {
            articles,
            error: None,
        }
    }

    fn failed(msg: &'static str) -> Self {
        Self {
            articles: Vec::new(),
            error: Some(msg),
        }
    }
}

pub struct AggregationEngine {
    remote: Arc<dyn RemoteSource>,
    static_urls: Arc<dyn StaticUrlProvider>,
    scraper: Arc<StaticArticleScraper>,
    cache: ArticleCache,
}

impl AggregationEngine {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        static_urls: Arc<dyn StaticUrlProvider>,
        scraper: Arc<StaticArticleScraper>,
        cache: ArticleCache,
    ) -> Self {
        Self {
            remote,
            static_urls,
            scraper,
            cache,
        }
    }

    /// Wire the real HTTP-backed sources from configuration.
    pub fn from_config(cfg: &AggregatorConfig) -> Result<Self> {
        let http = build_http_client(cfg)?;
        let search = SearchApiClient::from_config(http.clone(), cfg);
        let remote = RemoteArticleFetcher::new(Arc::new(search), cfg.fetch_limit, cfg.max_page_size);
        let scraper = StaticArticleScraper::new(
            Arc::new(HttpPageFetcher::new(http)),
            cfg.feature_category_label.clone(),
        )
        .with_concurrency(cfg.scrape_concurrency);

        Ok(Self::new(
            Arc::new(remote),
            Arc::new(StaticUrlFile::new(&cfg.static_urls_path)),
            Arc::new(scraper),
            ArticleCache::new(cfg.cache_ttl()),
        ))
    }

    /// Never fails: source errors come back in `AggregatedPage::error`.
    pub async fn get_page(
        &self,
        device: DeviceClass,
        req: PageRequest,
        now: DateTime<Utc>,
    ) -> AggregatedPage {
        ensure_metrics_described();

        if let Some(entry) = self.cache.get_fresh(device, now) {
            counter!("aggregator_cache_hits_total").increment(1);
            info!(device = device.as_str(), cached_at = %entry.cached_at, "serving cached articles");
            return page_of(&entry, req, None, true);
        }

        let _refresh = self.cache.lock_refresh(device).await;
        // Another request may have refreshed while we waited.
        if let Some(entry) = self.cache.get_fresh(device, now) {
            counter!("aggregator_cache_hits_total").increment(1);
            info!(device = device.as_str(), "refresh collapsed into in-flight result");
            return page_of(&entry, req, None, true);
        }

        counter!("aggregator_cache_misses_total").increment(1);
        info!(device = device.as_str(), "cache expired or empty; refreshing");
        let t0 = std::time::Instant::now();
        let (articles, errors) = self.refresh(device).await;
        histogram!("aggregator_refresh_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let entry = self.cache.put(device, articles, now);
        info!(
            device = device.as_str(),
            total = entry.articles.len(),
            errors = errors.len(),
            "articles cached"
        );

        let error = if errors.is_empty() {
            None
        } else {
            Some(errors.join(" "))
        };
        page_of(&entry, req, error, false)
    }

    /// Fetch both sources concurrently and merge. Returns the sorted list and
    /// the user-facing messages of every source that failed.
    async fn refresh(&self, device: DeviceClass) -> (Vec<ArticleRecord>, Vec<&'static str>) {
        let (remote, statics) = tokio::join!(self.run_remote(), self.run_static(device));

        let mut errors = Vec::new();
        errors.extend(remote.error);
        errors.extend(statics.error);

        let merged = merge_sorted(remote.articles, statics.articles);
        (merged, errors)
    }

    async fn run_remote(&self) -> SourceOutcome {
        let remote = Arc::clone(&self.remote);
        let name = remote.name();
        match tokio::spawn(async move { remote.fetch_articles().await }).await {
            Ok(Ok(v)) => SourceOutcome::ok(v),
            Ok(Err(e)) => {
                error!(error = ?e, source = name, "remote source fetch failed");
                counter!("aggregator_source_errors_total", "source" => "remote").increment(1);
                SourceOutcome::failed(REMOTE_FETCH_ERROR)
            }
            Err(e) => {
                error!(error = %e, source = name, "remote source task aborted");
                counter!("aggregator_source_errors_total", "source" => "remote").increment(1);
                SourceOutcome::failed(REMOTE_FETCH_ERROR)
            }
        }
    }

    async fn run_static(&self, device: DeviceClass) -> SourceOutcome {
        let urls = match self.static_urls.urls_for(device).await {
            Ok(u) => u,
            Err(e) => {
                error!(error = ?e, device = device.as_str(), "static url config unavailable");
                counter!("aggregator_source_errors_total", "source" => "static_config").increment(1);
                return SourceOutcome::failed(STATIC_CONFIG_ERROR);
            }
        };
        if urls.is_empty() {
            return SourceOutcome::default();
        }

        let scraper = Arc::clone(&self.scraper);
        match tokio::spawn(async move { scraper.scrape_all(&urls).await }).await {
            Ok(v) => SourceOutcome::ok(v),
            Err(e) => {
                error!(error = %e, device = device.as_str(), "static scrape task aborted");
                counter!("aggregator_source_errors_total", "source" => "static_scrape").increment(1);
                SourceOutcome::failed(STATIC_SCRAPE_ERROR)
            }
        }
    }
}

/// Remote first, then static; later records with an already-seen URL are dropped
/// (records without a URL are always kept). Stable sort, newest first.
pub fn merge_sorted(remote: Vec<ArticleRecord>, statics: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<ArticleRecord> = Vec::with_capacity(remote.len() + statics.len());
    let mut dropped = 0usize;
    for a in remote.into_iter().chain(statics) {
        if !a.url.is_empty() && !seen.insert(a.url.clone()) {
            dropped += 1;
            continue;
        }
        merged.push(a);
    }
    if dropped > 0 {
        warn!(dropped, "duplicate article urls removed");
    }
    merged.sort_by(|a, b| b.publish_instant.cmp(&a.publish_instant));
    merged
}

fn page_of(
    entry: &CacheEntry,
    req: PageRequest,
    error: Option<String>,
    cache_hit: bool,
) -> AggregatedPage {
    let all = entry.articles.as_slice();
    let (start, end) = req.bounds();
    let articles = if start >= all.len() {
        Vec::new()
    } else {
        all[start..end.min(all.len())].to_vec()
    };
    AggregatedPage {
        articles,
        total_count: all.len(),
        error,
        cache_hit,
    }
}
