//! # Article cache
//! Per-device-class TTL store of the merged, sorted article list.
//!
//! Entries are replaced wholesale and live only in process memory. Each device
//! class also owns an async refresh lock; the engine holds it while refreshing so
//! concurrent misses for one class collapse into a single upstream fetch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::article::ArticleRecord;
use crate::device::DeviceClass;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub device_class: DeviceClass,
    /// Sorted descending by `publish_instant`.
    pub articles: Arc<Vec<ArticleRecord>>,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ArticleCache {
    ttl: Duration,
    entries: RwLock<HashMap<DeviceClass, CacheEntry>>,
    mobile_refresh: tokio::sync::Mutex<()>,
    desktop_refresh: tokio::sync::Mutex<()>,
}

impl ArticleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            mobile_refresh: tokio::sync::Mutex::new(()),
            desktop_refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// One hour.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::hours(1))
    }

    pub fn get(&self, device: DeviceClass) -> Option<CacheEntry> {
        let g = self.entries.read().unwrap_or_else(|p| p.into_inner());
        g.get(&device).cloned()
    }

    pub fn put(&self, device: DeviceClass, articles: Vec<ArticleRecord>, now: DateTime<Utc>) -> CacheEntry {
        let entry = CacheEntry {
            device_class: device,
            articles: Arc::new(articles),
            cached_at: now,
        };
        let mut g = self.entries.write().unwrap_or_else(|p| p.into_inner());
        g.insert(device, entry.clone());
        entry
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.cached_at) < self.ttl
    }

    /// Fresh entry for `device`, if any.
    pub fn get_fresh(&self, device: DeviceClass, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.get(device).filter(|e| self.is_fresh(e, now))
    }

    /// Single-flight guard for refreshing `device`.
    pub async fn lock_refresh(&self, device: DeviceClass) -> tokio::sync::MutexGuard<'_, ()> {
        match device {
            DeviceClass::Mobile => self.mobile_refresh.lock().await,
            DeviceClass::Desktop => self.desktop_refresh.lock().await,
        }
    }
}

impl Default for ArticleCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
