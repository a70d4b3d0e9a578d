// src/ingest/types.rs
use anyhow::Result;
use serde::Deserialize;

use crate::article::ArticleRecord;
use crate::device::DeviceClass;

/// One item of the remote search response. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteArticle {
    #[serde(deserialize_with = "string_or_number")]
    pub article_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub open_date: Option<String>,
    #[serde(default)]
    pub thumbnail_image: Option<RemoteThumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RemoteThumbnail {
    #[serde(default)]
    pub url: Option<String>,
}

/// Accepts `articleId` as either a JSON string or a number.
fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "articleId must be a string or number, got {other}"
        ))),
    }
}

/// A remote upstream producing normalized records for one refresh cycle.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_articles(&self) -> Result<Vec<ArticleRecord>>;
    fn name(&self) -> &'static str;
}

/// One paginated call against the search API.
#[async_trait::async_trait]
pub trait SearchPageClient: Send + Sync {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RemoteArticle>>;
}

/// Supplies the static page URLs to scrape for a device class.
#[async_trait::async_trait]
pub trait StaticUrlProvider: Send + Sync {
    async fn urls_for(&self, device: DeviceClass) -> Result<Vec<String>>;
}

/// Fetches raw HTML. Non-2xx statuses must surface as errors.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}
