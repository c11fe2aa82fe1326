use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{decode, encode, CacheStore};

/// 带类型的缓存门面，后端故障只记录日志不向上传播
/// Typed cache facade; backend failures are logged, never propagated
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// 探测后端是否可用 / Probe whether the backend answers
    pub async fn ping(&self) -> bool {
        self.store.get("health:probe").await.is_ok()
    }

    /// 读取并反序列化；任何失败都视为未命中
    /// Read and deserialize; any failure counts as a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "缓存未命中 / cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "读取缓存失败，按未命中处理 / cache read failed, treating as miss");
                return None;
            }
        };
        match decode(&raw) {
            Ok(value) => {
                debug!(key, "缓存命中 / cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "缓存值无法解析，已丢弃 / undecodable cache value dropped");
                self.remove(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "缓存值序列化失败 / cache value serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.set(key, raw, ttl).await {
            warn!(key, error = %e, "写入缓存失败 / cache write failed");
        }
    }

    pub async fn remove(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => debug!(key, "缓存已失效 / cache key invalidated"),
            Err(e) => warn!(key, error = %e, "缓存失效失败 / cache invalidation failed"),
        }
    }

    pub async fn remove_by_prefix(&self, prefix: &str) {
        match self.store.delete_by_prefix(prefix).await {
            Ok(removed) => debug!(prefix, removed, "按前缀失效缓存 / prefix invalidated"),
            Err(e) => warn!(prefix, error = %e, "按前缀失效缓存失败 / prefix invalidation failed"),
        }
    }

    /// 读穿透：命中直接返回（不做重新校验）；未命中时调用 `load`，
    /// 结果为 `Some` 时回填缓存。`load` 的错误原样返回。
    /// Read-through: a hit is returned as stored; on a miss `load` runs and a `Some`
    /// result is written back. Errors from `load` are returned untouched.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(Some(hit));
        }
        let loaded = load().await?;
        if let Some(value) = &loaded {
            self.set(key, value, ttl).await;
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_get_or_load_populates_then_hits() {
        let backend = MemoryCache::new();
        let cache = CacheService::new(Arc::new(backend.clone()));
        let ttl = Duration::from_secs(60);

        let first: Result<Option<Vec<String>>, ()> = cache
            .get_or_load("k", ttl, || async { Ok(Some(vec!["a".to_string()])) })
            .await;
        assert_eq!(first.unwrap().unwrap(), vec!["a"]);
        assert!(backend.contains_key("k"));

        // 命中时不会再调用加载函数
        let mut loader_ran = false;
        let second: Result<Option<Vec<String>>, ()> = cache
            .get_or_load("k", ttl, || {
                loader_ran = true;
                async { Ok(Some(vec!["b".to_string()])) }
            })
            .await;
        assert_eq!(second.unwrap().unwrap(), vec!["a"]);
        assert!(!loader_ran);
    }

    #[tokio::test]
    async fn test_none_is_not_cached() {
        let backend = MemoryCache::new();
        let cache = CacheService::new(Arc::new(backend.clone()));
        let res: Result<Option<u32>, ()> = cache
            .get_or_load("missing", Duration::from_secs(60), || async { Ok(None) })
            .await;
        assert!(res.unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_fail_open_when_backend_down() {
        let backend = MemoryCache::new();
        backend.set_offline(true);
        let cache = CacheService::new(Arc::new(backend));
        let res: Result<Option<u32>, ()> = cache
            .get_or_load("k", Duration::from_secs(60), || async { Ok(Some(7)) })
            .await;
        assert_eq!(res.unwrap(), Some(7));
        cache.remove("k").await;
        cache.remove_by_prefix("user:").await;
    }

    #[tokio::test]
    async fn test_undecodable_value_is_dropped() {
        let backend = MemoryCache::new();
        backend
            .set("k", "not json".into(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = CacheService::new(Arc::new(backend.clone()));
        assert!(cache.get::<u32>("k").await.is_none());
        assert!(!backend.contains_key("k"));
    }
}
