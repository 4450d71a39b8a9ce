//! Fingerprint-keyed memoization of stage outputs

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Cache, CacheEntry, CacheExt, Fingerprint};
use crate::domain::envelope::StageName;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss,
    /// Present but past its TTL; treated as a miss
    Expired,
    /// Backend failure; treated as a miss
    Unavailable,
}

impl CacheLookup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss => "miss",
            Self::Expired => "expired",
            Self::Unavailable => "error",
        }
    }

    pub fn into_output(self) -> Option<Value> {
        match self {
            Self::Hit(entry) => Some(entry.output),
            _ => None,
        }
    }
}

/// Response cache over any [`Cache`] backend.
///
/// Backend failures are logged and never surface to the caller.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    backend: Arc<dyn Cache>,
    key_prefix: String,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn Cache>, default_ttl: Duration) -> Self {
        Self {
            backend,
            key_prefix: "response".to_string(),
            default_ttl,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn backend(&self) -> &Arc<dyn Cache> {
        &self.backend
    }

    fn key(&self, fingerprint: &Fingerprint) -> String {
        format!("{}:{}", self.key_prefix, fingerprint)
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> CacheLookup {
        match self.backend.get::<CacheEntry>(&self.key(fingerprint)).await {
            Ok(Some(entry)) if entry.is_expired() => {
                debug!(fingerprint = %fingerprint, "Cache entry expired");
                CacheLookup::Expired
            }
            Ok(Some(entry)) => CacheLookup::Hit(entry),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "Cache lookup failed");
                CacheLookup::Unavailable
            }
        }
    }

    /// Store a stage output; last writer wins
    pub async fn put(&self, fingerprint: Fingerprint, stage: StageName, output: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let key = self.key(&fingerprint);
        let entry = CacheEntry::new(fingerprint, stage, output, ttl);

        if let Err(e) = self.backend.set(&key, &entry, ttl).await {
            warn!(fingerprint = %entry.fingerprint, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_then_get_hits() {
        let cache = ResponseCache::new(Arc::new(MockCache::new()), Duration::from_secs(60));
        let fp = Fingerprint::compute(StageName::Parse, "build X");

        assert_eq!(cache.get(&fp).await, CacheLookup::Miss);

        cache
            .put(fp.clone(), StageName::Parse, json!({"intent": "x"}), None)
            .await;

        let lookup = cache.get(&fp).await;
        assert_eq!(lookup.label(), "hit");
        assert_eq!(lookup.into_output(), Some(json!({"intent": "x"})));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let backend = Arc::new(MockCache::new());
        let cache = ResponseCache::new(backend.clone(), Duration::from_secs(60));
        let fp = Fingerprint::compute(StageName::Parse, "build X");

        cache
            .put(fp.clone(), StageName::Parse, json!(1), Some(Duration::ZERO))
            .await;

        let lookup = cache.get(&fp).await;
        assert_eq!(lookup, CacheLookup::Expired);
        assert!(lookup.into_output().is_none());
    }

    #[tokio::test]
    async fn test_backend_errors_are_misses() {
        let cache = ResponseCache::new(
            Arc::new(MockCache::new().with_error("connection refused")),
            Duration::from_secs(60),
        );
        let fp = Fingerprint::compute(StageName::Design, "x");

        cache.put(fp.clone(), StageName::Design, json!(1), None).await;
        assert_eq!(cache.get(&fp).await, CacheLookup::Unavailable);
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let backend = Arc::new(MockCache::new());
        let cache = ResponseCache::new(backend.clone(), Duration::from_secs(60))
            .with_key_prefix("wfb");
        let fp = Fingerprint::compute(StageName::Parse, "x");

        cache.put(fp.clone(), StageName::Parse, json!(1), None).await;
        assert_eq!(backend.keys(), vec![format!("wfb:{}", fp)]);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_unavailable() {
        let fp = Fingerprint::compute(StageName::Parse, "x");
        let backend = MockCache::new().with_raw_entry(&format!("response:{}", fp), "not json");
        let cache = ResponseCache::new(Arc::new(backend), Duration::from_secs(60));

        assert_eq!(cache.get(&fp).await, CacheLookup::Unavailable);
    }
}
