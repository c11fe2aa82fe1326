//! 存储与缓存后端初始化
//! Store and cache backend initialization

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheStore, MemoryCache};
use crate::comm::config_validator::RedisSettings;
use crate::db::{build_pool, DatabaseSettings};
use crate::store::{MemoryStore, PgStore, RbacStore};

/// 初始化缓存后端
/// Initialize the cache backend
///
/// 配置了 Redis 且启用了 `redis` 特性时使用 Redis，否则使用内存缓存
/// Redis is used when configured and the `redis` feature is enabled, otherwise memory
pub async fn init_cache(redis: &RedisSettings) -> Result<Arc<dyn CacheStore>> {
    if let Some(_url) = redis.url.as_deref() {
        #[cfg(feature = "redis")]
        {
            let cache = crate::cache::redis_cache::RedisCache::connect(_url).await?;
            return Ok(Arc::new(cache));
        }

        #[cfg(not(feature = "redis"))]
        {
            warn!("Redis 功能未启用，回退到内存缓存");
            warn!("Redis feature not enabled, falling back to memory cache");
        }
    } else {
        info!("使用内存缓存");
        info!("Using memory cache");
    }
    Ok(Arc::new(MemoryCache::new()))
}

/// 初始化实体存储；`migrate` 为 true 时先执行迁移
/// Initialize the entity store, running migrations first when `migrate` is set
pub async fn init_store(database: &DatabaseSettings, migrate: bool) -> Result<Arc<dyn RbacStore>> {
    if !database.is_configured() {
        warn!("未配置数据库，使用内存存储，重启后数据丢失");
        warn!("No database configured, using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = build_pool(database).await?;
    let store = PgStore::new(pool);
    if migrate {
        store.migrate().await?;
        info!("数据库迁移完成 / migrations applied");
    }
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_backends() {
        let cache = init_cache(&RedisSettings::default()).await.unwrap();
        assert_eq!(cache.backend(), "memory");

        let store = init_store(&DatabaseSettings::default(), true).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.ping().await.is_ok());
    }
}
