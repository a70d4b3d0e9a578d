// tests/common/mod.rs
//
// Fake upstreams with call counters, shared by the engine and HTTP tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use music_news_aggregator::article::{dated, parse_publish_date, ArticleRecord, SourceType};
use music_news_aggregator::cache::ArticleCache;
use music_news_aggregator::device::DeviceClass;
use music_news_aggregator::engine::AggregationEngine;
use music_news_aggregator::ingest::providers::static_page::StaticArticleScraper;
use music_news_aggregator::ingest::types::{PageFetcher, RemoteSource, StaticUrlProvider};

pub const LABEL: &str = "MV特集";

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn remote_rec(id: &str, date: Option<&str>) -> ArticleRecord {
    let (publish_instant, display_date) = dated(date.and_then(parse_publish_date));
    ArticleRecord {
        id: id.to_string(),
        source_type: SourceType::Remote,
        title: format!("Remote {id}"),
        description: "remote description".to_string(),
        url: format!("https://remote.example/articles/{id}"),
        thumbnail: None,
        publish_instant,
        display_date,
        feature_flag: false,
    }
}

pub fn page_html(title: &str, date: Option<&str>) -> String {
    let meta = date
        .map(|d| format!(r#"<meta name="date" content="{d}">"#))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{title}</title>{meta}</head>
<body><p>Body of {title}</p><img src="//cdn.example/{title}.jpg"></body></html>"#
    )
}

/// Remote source returning a swappable result.
pub struct FakeRemote {
    pub result: Mutex<Result<Vec<ArticleRecord>, String>>,
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl FakeRemote {
    pub fn ok(v: Vec<ArticleRecord>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(v)),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(msg.to_string())),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(v: Vec<ArticleRecord>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(v)),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn set(&self, r: Result<Vec<ArticleRecord>, String>) {
        *self.result.lock().unwrap() = r;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn fetch_articles(&self) -> Result<Vec<ArticleRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let r = self.result.lock().unwrap().clone();
        r.map_err(anyhow::Error::msg)
    }

    fn name(&self) -> &'static str {
        "fake-remote"
    }
}

/// Static URL lists per device, or a read failure.
pub struct FakeUrls {
    pub mobile: Vec<String>,
    pub desktop: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeUrls {
    pub fn new(mobile: Vec<String>, desktop: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            mobile,
            desktop,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn same(urls: Vec<String>) -> Arc<Self> {
        Self::new(urls.clone(), urls)
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            mobile: Vec::new(),
            desktop: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StaticUrlProvider for FakeUrls {
    async fn urls_for(&self, device: DeviceClass) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("config file unreadable");
        }
        Ok(match device {
            DeviceClass::Mobile => self.mobile.clone(),
            DeviceClass::Desktop => self.desktop.clone(),
        })
    }
}

/// In-memory pages; unknown URLs behave like a 404.
pub struct FakePages {
    pub pages: HashMap<String, String>,
    pub panic_on: Option<String>,
    pub calls: AtomicUsize,
}

impl FakePages {
    pub fn new(pages: Vec<(&str, String)>) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.into_iter().map(|(u, h)| (u.to_string(), h)).collect(),
            panic_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on.as_deref() == Some(url) {
            panic!("fetcher blew up on {url}");
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET {url}: 404 Not Found"))
    }
}

pub fn engine(
    remote: &Arc<FakeRemote>,
    urls: &Arc<FakeUrls>,
    pages: &Arc<FakePages>,
) -> AggregationEngine {
    let remote: Arc<dyn RemoteSource> = remote.clone();
    let urls: Arc<dyn StaticUrlProvider> = urls.clone();
    let fetcher: Arc<dyn PageFetcher> = pages.clone();
    let scraper = StaticArticleScraper::new(fetcher, LABEL).with_concurrency(2);
    AggregationEngine::new(remote, urls, Arc::new(scraper), ArticleCache::with_default_ttl())
}
