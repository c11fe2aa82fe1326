//! 有效权限解析 / Effective permission resolution
//!
//! 用户的有效权限 = 直接角色的权限 ∪ 所在组的角色的权限。
//! 结果以 `user:permissions:{id}` 缓存，由分配与实体变更负责失效。
//! A user's effective permissions are the union of their direct roles' permissions
//! and the permissions of roles held by their groups. Results are cached under
//! `user:permissions:{id}` and invalidated by assignment and entity changes.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheKeys, CacheService};
use crate::model::EffectivePermissions;
use crate::store::RbacStore;

#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    keys: CacheKeys,
    ttl: Duration,
}

impl PermissionResolver {
    pub fn new(
        store: Arc<dyn RbacStore>,
        cache: CacheService,
        keys: CacheKeys,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            keys,
            ttl,
        }
    }

    /// 解析用户有效权限；未知用户返回 `NotFound`
    /// Resolve effective permissions; unknown users yield `NotFound`
    #[instrument(skip(self))]
    pub async fn resolve_effective_permissions(
        &self,
        user_id: i64,
    ) -> ServiceResult<EffectivePermissions> {
        let key = self.keys.user_permissions(user_id);
        let store = self.store.clone();
        let resolved = self
            .cache
            .get_or_load(&key, self.ttl, || async move {
                let graph = store.user_access_graph(user_id).await?;
                Ok::<_, ServiceError>(graph.map(|g| {
                    let eff = EffectivePermissions::from_graph(&g);
                    debug!(
                        user_id,
                        direct_roles = g.direct_roles.len(),
                        groups = g.groups.len(),
                        total = eff.all_permissions.len(),
                        "已计算有效权限 / effective permissions computed"
                    );
                    eff
                }))
            })
            .await?;
        resolved.ok_or_else(|| ServiceError::not_found("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::model::{CreateUserRequest, EdgeKey, EdgeKind, UpdateUserRequest};
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, MemoryCache, PermissionResolver) {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let resolver = PermissionResolver::new(
            Arc::new(store.clone()),
            CacheService::new(Arc::new(cache.clone())),
            CacheKeys::default(),
            Duration::from_secs(900),
        );
        (store, cache, resolver)
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (_, cache, resolver) = setup().await;
        let err = resolver.resolve_effective_permissions(42).await.unwrap_err();
        match err {
            ServiceError::NotFound(msg) => assert_eq!(msg, "User with ID 42 not found"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cached_value_is_served_until_invalidated() {
        let (store, cache, resolver) = setup().await;
        let user = store
            .create_user(&CreateUserRequest {
                username: "solo".into(),
                email: "solo@example.com".into(),
                is_active: true,
            })
            .await
            .unwrap();

        let first = resolver.resolve_effective_permissions(user.user_id).await.unwrap();
        assert!(first.all_permissions.is_empty());
        assert!(cache.contains_key("user:permissions:1"));

        // 直接修改存储，不经过失效：缓存值保持不变
        store
            .update_user(
                user.user_id,
                &UpdateUserRequest {
                    username: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = resolver.resolve_effective_permissions(user.user_id).await.unwrap();
        assert_eq!(second.username, "solo");

        cache.delete("user:permissions:1").await.unwrap();
        let third = resolver.resolve_effective_permissions(user.user_id).await.unwrap();
        assert_eq!(third.username, "renamed");
    }

    #[tokio::test]
    async fn test_resolves_when_cache_is_down() {
        let (store, cache, resolver) = setup().await;
        let user = store
            .create_user(&CreateUserRequest {
                username: "u".into(),
                email: "u@example.com".into(),
                is_active: true,
            })
            .await
            .unwrap();
        let role = store
            .create_role(&crate::model::CreateRoleRequest {
                role_name: "R".into(),
                description: None,
            })
            .await
            .unwrap();
        let perm = store
            .create_permission(&crate::model::CreatePermissionRequest {
                permission_name: "report.view".into(),
                description: None,
            })
            .await
            .unwrap();
        store
            .insert_edge(EdgeKind::UserRole, EdgeKey::new(user.user_id, role.role_id))
            .await
            .unwrap();
        store
            .insert_edge(
                EdgeKind::RolePermission,
                EdgeKey::new(role.role_id, perm.permission_id),
            )
            .await
            .unwrap();

        cache.set_offline(true);
        let eff = resolver.resolve_effective_permissions(user.user_id).await.unwrap();
        assert_eq!(eff.all_permissions, vec!["report.view"]);
    }
}
