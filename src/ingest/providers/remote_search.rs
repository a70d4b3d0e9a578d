// src/ingest/providers/remote_search.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::article::{self, ArticleRecord, SourceType, Thumbnail, NO_DESCRIPTION};
use crate::config::AggregatorConfig;
use crate::ingest::types::{RemoteArticle, RemoteSource, SearchPageClient};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Option<Vec<RemoteArticle>>,
}

/// HTTP client for the article-search API.
#[derive(Clone)]
pub struct SearchApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    tag_id: u32,
    sort_type: String,
    label: String,
}

impl SearchApiClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            tag_id: 3,
            sort_type: "opendate".to_string(),
            label: "feature,report,interview,exclusive".to_string(),
        }
    }

    pub fn from_config(client: reqwest::Client, cfg: &AggregatorConfig) -> Self {
        if cfg.api_key.is_empty() {
            tracing::warn!("remote search api key is empty; upstream will likely reject calls");
        }
        Self {
            client,
            endpoint: cfg.remote_endpoint.clone(),
            api_key: cfg.api_key.clone(),
            tag_id: cfg.remote_tag_id,
            sort_type: cfg.remote_sort_type.clone(),
            label: cfg.remote_label.clone(),
        }
    }

    fn parse_body(body: &str) -> Result<Vec<RemoteArticle>> {
        let parsed: SearchResponse =
            serde_json::from_str(body).context("parsing search api response")?;
        Ok(parsed.articles.unwrap_or_default())
    }
}

#[async_trait]
impl SearchPageClient for SearchApiClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RemoteArticle>> {
        counter!("aggregator_remote_calls_total").increment(1);
        let body = self
            .client
            .get(&self.endpoint)
            .header("apikey", &self.api_key)
            .query(&[
                ("oshTagId", self.tag_id.to_string()),
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
                ("sortType", self.sort_type.clone()),
                ("label", self.label.clone()),
            ])
            .send()
            .await
            .context("search api get()")?
            .error_for_status()
            .context("search api status")?
            .text()
            .await
            .context("search api .text()")?;
        Self::parse_body(&body)
    }
}

/// Paginates the search API up to a fetch limit and normalizes the results.
pub struct RemoteArticleFetcher {
    client: Arc<dyn SearchPageClient>,
    fetch_limit: i64,
    max_page_size: u32,
}

impl RemoteArticleFetcher {
    pub fn new(client: Arc<dyn SearchPageClient>, fetch_limit: i64, max_page_size: u32) -> Self {
        Self {
            client,
            fetch_limit,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Raw paging loop. Stops on a short page or once the limit is reached;
    /// the first failing call aborts the whole fetch.
    pub async fn fetch_raw(&self) -> Result<Vec<RemoteArticle>> {
        if self.fetch_limit <= 0 {
            debug!("remote fetch disabled (limit <= 0)");
            return Ok(Vec::new());
        }
        let limit = usize::try_from(self.fetch_limit).unwrap_or(usize::MAX);

        let mut out: Vec<RemoteArticle> = Vec::new();
        let mut page: u32 = 1;
        while out.len() < limit {
            let remaining = limit - out.len();
            let want = remaining.min(self.max_page_size as usize) as u32;

            let mut batch = self
                .client
                .fetch_page(page, want)
                .await
                .with_context(|| format!("search api page {page}"))?;
            let got = batch.len();
            debug!(page, requested = want, got, "remote page fetched");
            out.append(&mut batch);

            if got < want as usize {
                break;
            }
            page = page.saturating_add(1);
        }
        out.truncate(limit);
        Ok(out)
    }
}

/// Map one search hit to the shared record shape.
pub fn normalize_remote(a: RemoteArticle) -> ArticleRecord {
    let publish = a.open_date.as_deref().and_then(article::parse_publish_date);
    let (publish_instant, display_date) = article::dated(publish);
    let title = a
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| article::placeholder_title(&a.article_id));
    let description = a
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    let thumbnail = a
        .thumbnail_image
        .and_then(|t| t.url)
        .filter(|u| !u.is_empty())
        .map(|url| Thumbnail { url });

    ArticleRecord {
        id: a.article_id,
        source_type: SourceType::Remote,
        title,
        description,
        url: a.url.unwrap_or_default(),
        thumbnail,
        publish_instant,
        display_date,
        feature_flag: false,
    }
}

#[async_trait]
impl RemoteSource for RemoteArticleFetcher {
    async fn fetch_articles(&self) -> Result<Vec<ArticleRecord>> {
        let t0 = std::time::Instant::now();
        let raw = self.fetch_raw().await?;
        let out: Vec<ArticleRecord> = raw.into_iter().map(normalize_remote).collect();

        histogram!("aggregator_remote_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(count = out.len(), limit = self.fetch_limit, "remote articles fetched");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "remote-search"
    }
}
