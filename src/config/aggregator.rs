// src/config/aggregator.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

fn default_endpoint() -> String {
    "https://rdc-api-catalog-gateway-api.rakuten.co.jp/oshiraku/search/v1/article".to_string()
}
fn default_tag_id() -> u32 {
    3
}
fn default_sort_type() -> String {
    "opendate".to_string()
}
fn default_label() -> String {
    "feature,report,interview,exclusive".to_string()
}
fn default_fetch_limit() -> i64 {
    100
}
fn default_max_page_size() -> u32 {
    100
}
fn default_scrape_concurrency() -> usize {
    4
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}
fn default_static_urls_path() -> PathBuf {
    PathBuf::from("config/staticNewsUrls.json")
}
fn default_feature_label() -> String {
    "MV特集".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_endpoint")]
    pub remote_endpoint: String,
    /// Sent as the `apikey` header. Usually supplied via `OSHIRAKU_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tag_id")]
    pub remote_tag_id: u32,
    #[serde(default = "default_sort_type")]
    pub remote_sort_type: String,
    #[serde(default = "default_label")]
    pub remote_label: String,
    /// Upper bound on remote records per refresh. `<= 0` disables the remote source.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: i64,
    /// Per-call cap enforced by the search API.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_scrape_concurrency")]
    pub scrape_concurrency: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default = "default_static_urls_path")]
    pub static_urls_path: PathBuf,
    /// Exact `category` meta value that marks a scraped page as a feature.
    #[serde(default = "default_feature_label")]
    pub feature_category_label: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: default_endpoint(),
            api_key: String::new(),
            remote_tag_id: default_tag_id(),
            remote_sort_type: default_sort_type(),
            remote_label: default_label(),
            fetch_limit: default_fetch_limit(),
            max_page_size: default_max_page_size(),
            scrape_concurrency: default_scrape_concurrency(),
            cache_ttl_secs: default_cache_ttl_secs(),
            allowed_origin: default_allowed_origin(),
            static_urls_path: default_static_urls_path(),
            feature_category_label: default_feature_label(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AggregatorConfig {
    /// Load from an explicit TOML file, then apply environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let cfg: AggregatorConfig = toml::from_str(&data)
            .with_context(|| format!("parsing aggregator config {}", path.display()))?;
        Ok(cfg.with_env_overrides().sanitized())
    }

    /// Resolution order:
    /// 1) $AGGREGATOR_CONFIG_PATH (must exist)
    /// 2) config/aggregator.toml if present
    /// 3) built-in defaults
    ///
    /// Environment overrides apply on top in every case.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default().with_env_overrides().sanitized())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("OSHIRAKU_API_KEY") {
            self.api_key = v;
        }
        // Deployment URL first, explicit origin wins.
        if let Some(v) = non_empty_env("VERCEL_URL") {
            self.allowed_origin = format!("https://{v}");
        }
        if let Some(v) = non_empty_env("ALLOWED_ORIGIN") {
            self.allowed_origin = v;
        }
        if let Some(v) = parse_env("REMOTE_FETCH_LIMIT") {
            self.fetch_limit = v;
        }
        if let Some(v) = parse_env("SCRAPE_CONCURRENCY") {
            self.scrape_concurrency = v;
        }
        if let Some(v) = parse_env("CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = non_empty_env("STATIC_NEWS_CONFIG_PATH") {
            self.static_urls_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env("FEATURE_CATEGORY_LABEL") {
            self.feature_category_label = v;
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.scrape_concurrency == 0 {
            self.scrape_concurrency = default_scrape_concurrency();
        }
        if self.max_page_size == 0 {
            self.max_page_size = default_max_page_size();
        }
        self
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_env(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}
