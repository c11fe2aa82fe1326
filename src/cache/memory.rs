//! 内存缓存后端 / In-memory cache backend

use super::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 每隔这么多次写入清理一次过期条目
const SWEEP_EVERY: u64 = 64;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// 带过期时间的内存缓存；读取时惰性清理，写入时定期整体清理
/// TTL-aware in-memory cache; expired entries are dropped on read and swept
/// periodically on write, so keys that are never read again do not pile up
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    writes: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟后端故障 / Simulate a backend outage
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 包含已过期但尚未清理的条目
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.entries.read().len()
    }

    fn check_online(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("memory cache is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_online()?;
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(e) if e.expires_at > now => return Ok(Some(e.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        // 已过期
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.entries.write();
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            entries.retain(|_, e| e.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check_online()?;
        self.entries.write().remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        self.check_online()?;
        let now = Instant::now();
        let mut removed = 0;
        // 顺带清掉过期条目，只统计仍然有效的匹配键
        self.entries.write().retain(|k, e| {
            let live = e.expires_at > now;
            if k.starts_with(prefix) {
                removed += live as u64;
                return false;
            }
            live
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("role:1", "{}".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("role:1").await.unwrap().as_deref(), Some("{}"));
        cache.delete("role:1").await.unwrap();
        assert!(cache.get("role:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("user:1", "x".into(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("user:1").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unread_expired_entries_are_swept() {
        let cache = MemoryCache::new();
        for i in 0..10 {
            cache
                .set(&format!("user:permissions:{}", i), "x".into(), Duration::from_millis(10))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.stored(), 10);

        let ttl = Duration::from_secs(60);
        for i in 0..SWEEP_EVERY {
            cache.set(&format!("role:{}", i), "v".into(), ttl).await.unwrap();
        }
        assert_eq!(cache.stored(), SWEEP_EVERY as usize);
        assert_eq!(cache.len(), SWEEP_EVERY as usize);
    }

    #[tokio::test]
    async fn test_prefix_delete_drops_expired_entries() {
        let cache = MemoryCache::new();
        cache
            .set("group:1", "x".into(), Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set("user:permissions:1", "x".into(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let removed = cache.delete_by_prefix("user:permissions:").await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(cache.stored(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        for key in ["user:permissions:1", "user:permissions:2", "user:1", "role:1"] {
            cache.set(key, "v".into(), ttl).await.unwrap();
        }
        let removed = cache.delete_by_prefix("user:permissions:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.contains_key("user:1"));
        assert!(cache.contains_key("role:1"));
    }

    #[tokio::test]
    async fn test_offline() {
        let cache = MemoryCache::new();
        cache.set_offline(true);
        assert!(cache.get("k").await.is_err());
    }
}
