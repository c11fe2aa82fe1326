//! 关系分配 / Relationship assignment
//!
//! 四类边（user-role、group-role、user-group、role-permission）的增删以及批量分配。
//! 每次成功的变更都会使受影响的有效权限缓存失效。
//! Add/remove on the four edge kinds plus bulk assignment. Every successful change
//! invalidates the effective-permission cache entries it can affect.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheKeys, CacheService};
use crate::model::{EdgeKey, EdgeKind};
use crate::store::{RbacStore, StoreError};

/// 单条分配的结果 / Outcome of a single assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    AlreadyExists,
}

/// 单条移除的结果 / Outcome of a single removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// 批量分配的方向 / Direction of a bulk assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    RolesToUser,
    UsersToGroup,
    PermissionsToRole,
}

impl BulkKind {
    fn edge_kind(&self) -> EdgeKind {
        match self {
            BulkKind::RolesToUser => EdgeKind::UserRole,
            BulkKind::UsersToGroup => EdgeKind::UserGroup,
            BulkKind::PermissionsToRole => EdgeKind::RolePermission,
        }
    }

    /// 由固定端与候选 id 组成边键
    fn key(&self, anchor: i64, id: i64) -> EdgeKey {
        match self {
            BulkKind::RolesToUser | BulkKind::PermissionsToRole => EdgeKey::new(anchor, id),
            // user_groups 的左端是用户
            BulkKind::UsersToGroup => EdgeKey::new(id, anchor),
        }
    }
}

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    keys: CacheKeys,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn RbacStore>, cache: CacheService, keys: CacheKeys) -> Self {
        Self { store, cache, keys }
    }

    pub async fn assign_role_to_user(&self, user_id: i64, role_id: i64) -> ServiceResult<AssignOutcome> {
        self.assign(EdgeKind::UserRole, EdgeKey::new(user_id, role_id)).await
    }

    pub async fn remove_role_from_user(&self, user_id: i64, role_id: i64) -> ServiceResult<RemoveOutcome> {
        self.remove(EdgeKind::UserRole, EdgeKey::new(user_id, role_id)).await
    }

    pub async fn assign_role_to_group(&self, group_id: i64, role_id: i64) -> ServiceResult<AssignOutcome> {
        self.assign(EdgeKind::GroupRole, EdgeKey::new(group_id, role_id)).await
    }

    pub async fn remove_role_from_group(&self, group_id: i64, role_id: i64) -> ServiceResult<RemoveOutcome> {
        self.remove(EdgeKind::GroupRole, EdgeKey::new(group_id, role_id)).await
    }

    pub async fn assign_user_to_group(&self, user_id: i64, group_id: i64) -> ServiceResult<AssignOutcome> {
        self.assign(EdgeKind::UserGroup, EdgeKey::new(user_id, group_id)).await
    }

    pub async fn remove_user_from_group(&self, user_id: i64, group_id: i64) -> ServiceResult<RemoveOutcome> {
        self.remove(EdgeKind::UserGroup, EdgeKey::new(user_id, group_id)).await
    }

    pub async fn assign_permission_to_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> ServiceResult<AssignOutcome> {
        self.assign(EdgeKind::RolePermission, EdgeKey::new(role_id, permission_id))
            .await
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> ServiceResult<RemoveOutcome> {
        self.remove(EdgeKind::RolePermission, EdgeKey::new(role_id, permission_id))
            .await
    }

    pub async fn bulk_assign_roles_to_user(&self, user_id: i64, role_ids: &[i64]) -> ServiceResult<u64> {
        self.bulk_assign(BulkKind::RolesToUser, user_id, role_ids).await
    }

    pub async fn bulk_assign_users_to_group(&self, group_id: i64, user_ids: &[i64]) -> ServiceResult<u64> {
        self.bulk_assign(BulkKind::UsersToGroup, group_id, user_ids).await
    }

    pub async fn bulk_assign_permissions_to_role(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> ServiceResult<u64> {
        self.bulk_assign(BulkKind::PermissionsToRole, role_id, permission_ids)
            .await
    }

    #[instrument(skip(self, kind), fields(kind = %kind))]
    async fn assign(&self, kind: EdgeKind, key: EdgeKey) -> ServiceResult<AssignOutcome> {
        if self.store.edge_exists(kind, key).await? {
            return Ok(AssignOutcome::AlreadyExists);
        }
        match self.store.insert_edge(kind, key).await {
            Ok(()) => {}
            // 并发插入同一条边时，后到者视为已存在
            Err(StoreError::Conflict(_)) => return Ok(AssignOutcome::AlreadyExists),
            Err(e) => return Err(e.into()),
        }
        info!(left = key.left, right = key.right, "已分配 / assigned");
        self.invalidate_edge(kind, key).await;
        Ok(AssignOutcome::Assigned)
    }

    #[instrument(skip(self, kind), fields(kind = %kind))]
    async fn remove(&self, kind: EdgeKind, key: EdgeKey) -> ServiceResult<RemoveOutcome> {
        if !self.store.delete_edge(kind, key).await? {
            return Ok(RemoveOutcome::NotFound);
        }
        info!(left = key.left, right = key.right, "已移除 / removed");
        self.invalidate_edge(kind, key).await;
        Ok(RemoveOutcome::Removed)
    }

    /// 只插入尚不存在的边，返回新插入的数量；重复与已存在的 id 被静默跳过
    /// Insert only the edges that do not exist yet and return how many were added;
    /// duplicate and already-present ids are skipped silently
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn bulk_assign(&self, bulk: BulkKind, anchor: i64, ids: &[i64]) -> ServiceResult<u64> {
        let kind = bulk.edge_kind();
        let candidates: Vec<EdgeKey> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| bulk.key(anchor, id))
            .collect();
        if candidates.is_empty() {
            return Err(ServiceError::Validation(vec![
                "At least one id is required".to_string(),
            ]));
        }

        let existing: BTreeSet<EdgeKey> = self
            .store
            .existing_edges(kind, &candidates)
            .await?
            .into_iter()
            .collect();
        let fresh: Vec<EdgeKey> = candidates
            .into_iter()
            .filter(|k| !existing.contains(k))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.insert_edges(kind, &fresh).await?;
        info!(kind = %kind, anchor, inserted, "批量分配完成 / bulk assignment done");
        if inserted == 0 {
            return Ok(0);
        }

        match bulk {
            BulkKind::RolesToUser => {
                self.cache.remove(&self.keys.user_permissions(anchor)).await;
            }
            BulkKind::UsersToGroup => {
                for key in &fresh {
                    self.cache.remove(&self.keys.user_permissions(key.left)).await;
                }
            }
            BulkKind::PermissionsToRole => {
                self.cache.remove_by_prefix(&self.keys.user_permissions).await;
                self.cache.remove(&self.keys.role(anchor)).await;
            }
        }
        Ok(inserted)
    }

    /// 按边的种类失效缓存：用户侧的边只影响该用户，组或角色侧的边可能影响任意用户
    /// Invalidate by edge kind: user-side edges affect one user, group and role
    /// edges may affect any user
    async fn invalidate_edge(&self, kind: EdgeKind, key: EdgeKey) {
        match kind {
            EdgeKind::UserRole | EdgeKind::UserGroup => {
                self.cache.remove(&self.keys.user_permissions(key.left)).await;
            }
            EdgeKind::GroupRole => {
                self.cache.remove_by_prefix(&self.keys.user_permissions).await;
            }
            EdgeKind::RolePermission => {
                self.cache.remove_by_prefix(&self.keys.user_permissions).await;
                self.cache.remove(&self.keys.role(key.left)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::model::{CreateGroupRequest, CreatePermissionRequest, CreateRoleRequest, CreateUserRequest};
    use crate::store::MemoryStore;
    use std::time::Duration;

    struct Fixture {
        store: MemoryStore,
        cache: MemoryCache,
        service: AssignmentService,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let service = AssignmentService::new(
            Arc::new(store.clone()),
            CacheService::new(Arc::new(cache.clone())),
            CacheKeys::default(),
        );
        for name in ["a", "b", "c"] {
            store
                .create_user(&CreateUserRequest {
                    username: name.into(),
                    email: format!("{}@example.com", name),
                    is_active: true,
                })
                .await
                .unwrap();
            store
                .create_role(&CreateRoleRequest {
                    role_name: name.into(),
                    description: None,
                })
                .await
                .unwrap();
            store
                .create_permission(&CreatePermissionRequest {
                    permission_name: format!("{}.read", name),
                    description: None,
                })
                .await
                .unwrap();
        }
        store
            .create_group(&CreateGroupRequest {
                group_name: "g".into(),
                description: None,
            })
            .await
            .unwrap();
        Fixture {
            store,
            cache,
            service,
        }
    }

    async fn warm(cache: &MemoryCache, keys: &[&str]) {
        for key in keys {
            cache
                .set(key, "{}".into(), Duration::from_secs(60))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let f = fixture().await;
        assert_eq!(
            f.service.assign_role_to_user(1, 2).await.unwrap(),
            AssignOutcome::Assigned
        );
        assert_eq!(
            f.service.assign_role_to_user(1, 2).await.unwrap(),
            AssignOutcome::AlreadyExists
        );
        assert!(f
            .store
            .edge_exists(EdgeKind::UserRole, EdgeKey::new(1, 2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_assign_missing_endpoint() {
        let f = fixture().await;
        let err = f.service.assign_role_to_user(1, 99).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_reports_missing_edge() {
        let f = fixture().await;
        assert_eq!(
            f.service.remove_user_from_group(1, 1).await.unwrap(),
            RemoveOutcome::NotFound
        );
        f.service.assign_user_to_group(1, 1).await.unwrap();
        assert_eq!(
            f.service.remove_user_from_group(1, 1).await.unwrap(),
            RemoveOutcome::Removed
        );
    }

    #[tokio::test]
    async fn test_user_edge_invalidates_only_that_user() {
        let f = fixture().await;
        warm(&f.cache, &["user:permissions:1", "user:permissions:2"]).await;
        f.service.assign_role_to_user(1, 1).await.unwrap();
        assert!(!f.cache.contains_key("user:permissions:1"));
        assert!(f.cache.contains_key("user:permissions:2"));
    }

    #[tokio::test]
    async fn test_role_permission_edge_invalidates_everyone() {
        let f = fixture().await;
        f.service.assign_permission_to_role(1, 1).await.unwrap();
        warm(&f.cache, &["user:permissions:1", "user:permissions:2", "role:1", "user:3"]).await;
        f.service.remove_permission_from_role(1, 1).await.unwrap();
        assert!(!f.cache.contains_key("user:permissions:1"));
        assert!(!f.cache.contains_key("user:permissions:2"));
        assert!(!f.cache.contains_key("role:1"));
        assert!(f.cache.contains_key("user:3"));
    }

    #[tokio::test]
    async fn test_noop_does_not_invalidate() {
        let f = fixture().await;
        f.service.assign_role_to_group(1, 1).await.unwrap();
        warm(&f.cache, &["user:permissions:1"]).await;
        f.service.assign_role_to_group(1, 1).await.unwrap();
        f.service.remove_role_from_group(1, 3).await.unwrap();
        assert!(f.cache.contains_key("user:permissions:1"));
    }

    #[tokio::test]
    async fn test_group_role_edge_invalidates_every_user() {
        let f = fixture().await;
        warm(&f.cache, &["user:permissions:1", "user:permissions:9", "user:1"]).await;
        assert_eq!(
            f.service.assign_role_to_group(1, 2).await.unwrap(),
            AssignOutcome::Assigned
        );
        assert!(!f.cache.contains_key("user:permissions:1"));
        assert!(!f.cache.contains_key("user:permissions:9"));
        assert!(f.cache.contains_key("user:1"));

        warm(&f.cache, &["user:permissions:1", "user:permissions:9"]).await;
        assert_eq!(
            f.service.remove_role_from_group(1, 2).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert!(!f.cache.contains_key("user:permissions:1"));
        assert!(!f.cache.contains_key("user:permissions:9"));
        assert!(f.cache.contains_key("user:1"));
    }

    #[tokio::test]
    async fn test_bulk_permissions_to_role_invalidates_role_and_users() {
        let f = fixture().await;
        f.service.assign_permission_to_role(2, 1).await.unwrap();
        warm(
            &f.cache,
            &["user:permissions:1", "user:permissions:3", "role:2", "role:1", "user:1"],
        )
        .await;

        let inserted = f
            .service
            .bulk_assign_permissions_to_role(2, &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert!(!f.cache.contains_key("user:permissions:1"));
        assert!(!f.cache.contains_key("user:permissions:3"));
        assert!(!f.cache.contains_key("role:2"));
        assert!(f.cache.contains_key("role:1"));
        assert!(f.cache.contains_key("user:1"));
        for permission_id in 1..=3 {
            assert!(f
                .store
                .edge_exists(EdgeKind::RolePermission, EdgeKey::new(2, permission_id))
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_bulk_counts_only_new_edges() {
        let f = fixture().await;
        f.service.assign_role_to_user(1, 1).await.unwrap();
        let inserted = f
            .service
            .bulk_assign_roles_to_user(1, &[1, 2, 3, 2])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        let again = f.service.bulk_assign_roles_to_user(1, &[1, 2, 3]).await.unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_bulk_users_to_group_invalidates_new_members() {
        let f = fixture().await;
        f.service.assign_user_to_group(1, 1).await.unwrap();
        warm(&f.cache, &["user:permissions:1", "user:permissions:2", "user:permissions:3"]).await;
        let inserted = f.service.bulk_assign_users_to_group(1, &[1, 2]).await.unwrap();
        assert_eq!(inserted, 1);
        assert!(f.cache.contains_key("user:permissions:1"));
        assert!(!f.cache.contains_key("user:permissions:2"));
        assert!(f.cache.contains_key("user:permissions:3"));
    }

    #[tokio::test]
    async fn test_bulk_with_unknown_id_inserts_nothing() {
        let f = fixture().await;
        let err = f
            .service
            .bulk_assign_permissions_to_role(1, &[1, 99])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(!f
            .store
            .edge_exists(EdgeKind::RolePermission, EdgeKey::new(1, 1))
            .await
            .unwrap());
    }
}
