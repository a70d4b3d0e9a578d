// src/config/static_urls.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::device::DeviceClass;
use crate::ingest::types::StaticUrlProvider;

/// On-disk list of static article pages, one list per device class.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaticUrlConfig {
    #[serde(default)]
    pub mobile_urls: Vec<String>,
    #[serde(default)]
    pub pc_urls: Vec<String>,
}

impl StaticUrlConfig {
    pub fn parse(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parsing static url config json")
    }

    pub fn urls_for(&self, device: DeviceClass) -> &[String] {
        match device {
            DeviceClass::Mobile => &self.mobile_urls,
            DeviceClass::Desktop => &self.pc_urls,
        }
    }
}

/// Reads the JSON file on every call so edits are picked up on the next cache miss.
#[derive(Debug, Clone)]
pub struct StaticUrlFile {
    path: PathBuf,
}

impl StaticUrlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StaticUrlProvider for StaticUrlFile {
    async fn urls_for(&self, device: DeviceClass) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading static url config from {}", self.path.display()))?;
        let cfg = StaticUrlConfig::parse(&content)?;
        let urls = cfg.urls_for(device).to_vec();
        tracing::debug!(
            device = device.as_str(),
            count = urls.len(),
            path = %self.path.display(),
            "static url list loaded"
        );
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lists_read_as_empty() {
        let cfg = StaticUrlConfig::parse(r#"{"pcUrls": ["https://a.example/x.html"]}"#).unwrap();
        assert!(cfg.urls_for(DeviceClass::Mobile).is_empty());
        assert_eq!(cfg.urls_for(DeviceClass::Desktop), ["https://a.example/x.html"]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(StaticUrlConfig::parse("{ mobileUrls: ").is_err());
        assert!(StaticUrlConfig::parse(r#"{"mobileUrls": "not-a-list"}"#).is_err());
    }

    #[tokio::test]
    async fn file_is_read_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("staticNewsUrls.json");
        std::fs::write(&p, r#"{"mobileUrls": ["https://m.example/1.html"], "pcUrls": []}"#).unwrap();

        let src = StaticUrlFile::new(&p);
        let first = src.urls_for(DeviceClass::Mobile).await.unwrap();
        assert_eq!(first, vec!["https://m.example/1.html".to_string()]);

        std::fs::write(
            &p,
            r#"{"mobileUrls": ["https://m.example/1.html", "https://m.example/2.html"]}"#,
        )
        .unwrap();
        let second = src.urls_for(DeviceClass::Mobile).await.unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let src = StaticUrlFile::new("definitely/not/here.json");
        assert!(src.urls_for(DeviceClass::Desktop).await.is_err());
    }
}
