// src/ingest/providers/static_page.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::article::ArticleRecord;
use crate::ingest::extract;
use crate::ingest::types::PageFetcher;

/// Plain GET over reqwest. No auth.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} status"))?;
        resp.text().await.with_context(|| format!("GET {url} body"))
    }
}

/// Scrapes static article pages into [`ArticleRecord`]s.
pub struct StaticArticleScraper {
    fetcher: Arc<dyn PageFetcher>,
    feature_label: String,
    concurrency: usize,
}

impl StaticArticleScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, feature_label: impl Into<String>) -> Self {
        Self {
            fetcher,
            feature_label: feature_label.into(),
            concurrency: 4,
        }
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// `None` on any fetch failure; the caller treats it as "no article".
    #[instrument(level = "debug", skip(self))]
    pub async fn scrape(&self, url: &str) -> Option<ArticleRecord> {
        let html = match self.fetcher.fetch_html(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = ?e, %url, "static page fetch failed");
                counter!("aggregator_scrape_failures_total").increment(1);
                return None;
            }
        };
        debug!(%url, bytes = html.len(), "static page fetched");
        Some(extract::extract_article(&html, url, &self.feature_label))
    }

    /// Scrape every URL with at most `concurrency` requests in flight.
    /// Output keeps the input order; failed pages are dropped.
    pub async fn scrape_all(&self, urls: &[String]) -> Vec<ArticleRecord> {
        let t0 = std::time::Instant::now();
        let articles: Vec<ArticleRecord> = stream::iter(urls.iter().cloned())
            .map(|url| async move { self.scrape(&url).await })
            .buffered(self.concurrency)
            .filter_map(|opt| std::future::ready(opt))
            .collect()
            .await;

        histogram!("aggregator_scrape_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            requested = urls.len(),
            scraped = articles.len(),
            "static pages scraped"
        );
        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many fetches overlap. Later URLs finish sooner so that
    /// completion order differs from input order.
    struct SlowPages {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        total: usize,
    }

    #[async_trait]
    impl PageFetcher for SlowPages {
        async fn fetch_html(&self, url: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let idx: usize = url
                .rsplit('/')
                .next()
                .and_then(|s| s.trim_end_matches(".html").strip_prefix("p"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let wait = 5 * (self.total - idx) as u64;
            tokio::time::sleep(Duration::from_millis(wait)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if idx == 4 {
                anyhow::bail!("GET {url}: 404 Not Found");
            }
            Ok(format!("<html><head><title>Page {idx}</title></head></html>"))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_out_is_bounded_and_keeps_url_order() {
        let pages = Arc::new(SlowPages {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: 12,
        });
        let fetcher: Arc<dyn PageFetcher> = pages.clone();
        let scraper = Arc::new(StaticArticleScraper::new(fetcher, "MV特集").with_concurrency(3));
        let urls: Vec<String> = (0..12)
            .map(|i| format!("https://static.example/column/p{i}.html"))
            .collect();

        // Same shape as the refresh path: the fan-out runs inside a spawned task.
        let out = tokio::spawn({
            let scraper = Arc::clone(&scraper);
            async move { scraper.scrape_all(&urls).await }
        })
        .await
        .expect("scrape task");

        let peak = pages.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in flight was {peak}");
        assert!(peak >= 2, "fan-out never overlapped");

        let ids: Vec<String> = out.into_iter().map(|a| a.id).collect();
        let expected: Vec<String> = (0..12).filter(|i| *i != 4).map(|i| format!("p{i}")).collect();
        assert_eq!(ids, expected);
    }
}
