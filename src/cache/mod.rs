//! 缓存层 / Cache layer
//!
//! [`CacheStore`] 是键值后端的最小契约；[`CacheService`] 在其上提供带类型的
//! 读穿透与失效操作，并且对后端故障“失败开放”（记录日志后按未命中处理）。
//! [`CacheStore`] is the minimal key-value contract; [`CacheService`] layers typed
//! read-through and invalidation on top and fails open on backend errors.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod service;

pub use memory::MemoryCache;
pub use service::CacheService;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// 缓存值统一使用 JSON 编码 / Cache values are stored as JSON
pub fn encode<T: Serialize>(value: &T) -> CacheResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> CacheResult<T> {
    Ok(serde_json::from_str(raw)?)
}

/// 键值缓存后端，值为不透明的序列化字符串
/// Key-value cache backend; values are opaque serialized strings
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn backend(&self) -> &'static str;
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
    /// 删除所有以 `prefix` 开头的键，返回删除数量
    /// Delete every key starting with `prefix`, returning how many went away
    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;
}

/// 缓存键前缀 / Cache key prefixes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheKeys {
    pub user: String,
    pub user_permissions: String,
    pub group: String,
    pub role: String,
    pub permission: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            user: "user:".to_string(),
            user_permissions: "user:permissions:".to_string(),
            group: "group:".to_string(),
            role: "role:".to_string(),
            permission: "permission:".to_string(),
        }
    }
}

impl CacheKeys {
    pub fn user(&self, user_id: i64) -> String {
        format!("{}{}", self.user, user_id)
    }

    pub fn user_permissions(&self, user_id: i64) -> String {
        format!("{}{}", self.user_permissions, user_id)
    }

    pub fn group(&self, group_id: i64) -> String {
        format!("{}{}", self.group, group_id)
    }

    pub fn role(&self, role_id: i64) -> String {
        format!("{}{}", self.role, role_id)
    }

    pub fn permission(&self, permission_id: i64) -> String {
        format!("{}{}", self.permission, permission_id)
    }
}

/// 缓存策略：过期时间与键前缀
/// Cache policy: expiries and key prefixes
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub permission_ttl: Duration,
    pub entity_ttl: Duration,
    pub keys: CacheKeys,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            permission_ttl: Duration::from_secs(15 * 60),
            entity_ttl: Duration::from_secs(10 * 60),
            keys: CacheKeys::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = CacheKeys::default();
        assert_eq!(keys.user_permissions(3), "user:permissions:3");
        assert_eq!(keys.role(2), "role:2");
        assert_eq!(keys.user(3), "user:3");
        // 用户实体键不能落入权限前缀下
        assert!(!keys.user(3).starts_with(&keys.user_permissions));
    }

    #[test]
    fn test_default_ttls() {
        let settings = CacheSettings::default();
        assert_eq!(settings.permission_ttl, Duration::from_secs(900));
        assert_eq!(settings.entity_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_undecodable_value_is_a_serde_error() {
        let err = decode::<Vec<String>>("not json").unwrap_err();
        assert!(matches!(err, CacheError::Serde(_)));
        assert!(err.to_string().starts_with("cache serialization error"));

        let raw = encode(&vec!["user.read"]).unwrap();
        assert_eq!(decode::<Vec<String>>(&raw).unwrap(), vec!["user.read"]);
    }
}
