//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};
use crate::config::{CacheConfig, CacheType};
use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache backend based on configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        info!(cache_type = %config.cache_type, "Creating response cache backend");

        match config.cache_type {
            CacheType::InMemory => {
                let in_memory_config = InMemoryCacheConfig::default()
                    .with_max_capacity(config.max_capacity)
                    .with_max_ttl(config.ttl().max(Duration::from_secs(1)));

                Ok(Arc::new(InMemoryCache::with_config(in_memory_config)))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let cache = RedisCache::new(RedisCacheConfig::new(url)).await?;
                Ok(Arc::new(cache))
            }
        }
    }

    pub fn create_in_memory(&self) -> Arc<dyn Cache> {
        Arc::new(InMemoryCache::new())
    }
}

/// Periodically drop expired entries until `shutdown` fires
pub fn spawn_sweeper(
    cache: Arc<dyn Cache>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => match cache.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Swept expired cache entries"),
                    Err(e) => warn!(error = %e, "Cache sweep failed"),
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::default())
            .await
            .unwrap();

        cache
            .set("test", &"value", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("test").await.unwrap();
        assert_eq!(result, Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_factory_create_redis_missing_url() {
        let config = CacheConfig {
            cache_type: CacheType::Redis,
            redis_url: None,
            ..Default::default()
        };

        let result = CacheFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = CacheFactory::new().create_in_memory();
        cache
            .set("stale", &1, Duration::from_millis(10))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(30), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(cache.size().await.unwrap(), 0);
    }

    #[test]
    fn test_cache_type_display() {
        assert_eq!(CacheType::InMemory.to_string(), "in_memory");
        assert_eq!(CacheType::Redis.to_string(), "redis");
    }
}
