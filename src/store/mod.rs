//! 实体存储抽象
//! Entity store abstraction
//!
//! 两个实现：进程内 [`memory::MemoryStore`] 与基于 sqlx 的 [`postgres::PgStore`]
//! Two implementations: in-process [`memory::MemoryStore`] and sqlx-backed [`postgres::PgStore`]

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{
    CreateGroupRequest, CreatePermissionRequest, CreateRoleRequest, CreateUserRequest, Edge,
    EdgeKey, EdgeKind, Group, GroupFilter, GroupGrant, Page, Permission, PermissionFilter, Role,
    RoleFilter, RoleGrant, UpdateGroupRequest, UpdatePermissionRequest, UpdateRoleRequest,
    UpdateUserRequest, User, UserAccessGraph, UserFilter,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 全量快照，用于导出 / Full snapshot used by export
#[derive(Debug, Clone, Default)]
pub struct RbacSnapshot {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub user_groups: Vec<Edge>,
    pub user_roles: Vec<Edge>,
    pub group_roles: Vec<Edge>,
    pub role_permissions: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    pub users: u64,
    pub groups: u64,
    pub roles: u64,
    pub permissions: u64,
}

#[async_trait]
pub trait RbacStore: Send + Sync {
    /// 后端名称，用于日志与健康检查 / backend name for logs and health checks
    fn backend(&self) -> &'static str;
    async fn ping(&self) -> StoreResult<()>;

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>>;
    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;
    async fn create_user(&self, req: &CreateUserRequest) -> StoreResult<User>;
    async fn update_user(&self, user_id: i64, req: &UpdateUserRequest) -> StoreResult<Option<User>>;
    async fn delete_user(&self, user_id: i64) -> StoreResult<bool>;

    async fn list_groups(&self, filter: &GroupFilter) -> StoreResult<Page<Group>>;
    async fn get_group(&self, group_id: i64) -> StoreResult<Option<Group>>;
    async fn create_group(&self, req: &CreateGroupRequest) -> StoreResult<Group>;
    async fn update_group(
        &self,
        group_id: i64,
        req: &UpdateGroupRequest,
    ) -> StoreResult<Option<Group>>;
    async fn delete_group(&self, group_id: i64) -> StoreResult<bool>;

    async fn list_roles(&self, filter: &RoleFilter) -> StoreResult<Page<Role>>;
    async fn get_role(&self, role_id: i64) -> StoreResult<Option<Role>>;
    async fn create_role(&self, req: &CreateRoleRequest) -> StoreResult<Role>;
    async fn update_role(&self, role_id: i64, req: &UpdateRoleRequest) -> StoreResult<Option<Role>>;
    async fn delete_role(&self, role_id: i64) -> StoreResult<bool>;
    /// 角色已授予的权限，按 id 排序 / permissions granted to a role, ordered by id
    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>>;

    async fn list_permissions(&self, filter: &PermissionFilter) -> StoreResult<Page<Permission>>;
    async fn get_permission(&self, permission_id: i64) -> StoreResult<Option<Permission>>;
    async fn create_permission(&self, req: &CreatePermissionRequest) -> StoreResult<Permission>;
    async fn update_permission(
        &self,
        permission_id: i64,
        req: &UpdatePermissionRequest,
    ) -> StoreResult<Option<Permission>>;
    async fn delete_permission(&self, permission_id: i64) -> StoreResult<bool>;

    async fn edge_exists(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool>;
    /// 重复的边返回 `Conflict`，端点不存在返回 `NotFound`
    /// Duplicate edge yields `Conflict`, missing endpoint yields `NotFound`
    async fn insert_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<()>;
    async fn delete_edge(&self, kind: EdgeKind, key: EdgeKey) -> StoreResult<bool>;
    /// 返回候选键中已存在的那些 / the subset of candidates that already exist
    async fn existing_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<Vec<EdgeKey>>;
    /// 原子批量插入，返回实际插入的行数
    /// Atomic batch insert returning the number of rows actually inserted
    async fn insert_edges(&self, kind: EdgeKind, keys: &[EdgeKey]) -> StoreResult<u64>;

    /// 一次性加载用户可达的两跳子图 / load the user's two-hop subgraph in one pass
    async fn user_access_graph(&self, user_id: i64) -> StoreResult<Option<UserAccessGraph>>;

    async fn snapshot(&self) -> StoreResult<RbacSnapshot>;
    async fn counts(&self) -> StoreResult<EntityCounts>;
}

/// 将按 (role_id, permission) 排好序的行折叠为角色授权
/// Fold rows ordered by (role_id, permission) into role grants
pub(crate) fn fold_role_rows<I>(rows: I) -> Vec<RoleGrant>
where
    I: IntoIterator<Item = (i64, Option<String>)>,
{
    let mut grants: Vec<RoleGrant> = Vec::new();
    for (role_id, permission) in rows {
        if grants.last().map(|g| g.role_id) != Some(role_id) {
            grants.push(RoleGrant {
                role_id,
                permissions: Vec::new(),
            });
        }
        if let (Some(name), Some(last)) = (permission, grants.last_mut()) {
            last.permissions.push(name);
        }
    }
    grants
}

/// 将按 (group_id, role_id, permission) 排好序的行折叠为组授权
/// Fold rows ordered by (group_id, role_id, permission) into group grants
pub(crate) fn fold_group_rows<I>(rows: I) -> Vec<GroupGrant>
where
    I: IntoIterator<Item = (i64, Option<i64>, Option<String>)>,
{
    let mut buckets: Vec<(i64, Vec<(i64, Option<String>)>)> = Vec::new();
    for (group_id, role_id, permission) in rows {
        if buckets.last().map(|(id, _)| *id) != Some(group_id) {
            buckets.push((group_id, Vec::new()));
        }
        if let (Some(role_id), Some((_, role_rows))) = (role_id, buckets.last_mut()) {
            role_rows.push((role_id, permission));
        }
    }
    buckets
        .into_iter()
        .map(|(group_id, role_rows)| GroupGrant {
            group_id,
            roles: fold_role_rows(role_rows),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_role_rows_keeps_empty_roles() {
        let rows = vec![
            (3, Some("user.read".to_string())),
            (3, Some("user.write".to_string())),
            (4, None),
            (5, Some("role.read".to_string())),
        ];
        let grants = fold_role_rows(rows);
        assert_eq!(grants.len(), 3);
        assert_eq!(grants[0].permissions, vec!["user.read", "user.write"]);
        assert!(grants[1].permissions.is_empty());
        assert_eq!(grants[2].role_id, 5);
    }

    #[test]
    fn test_fold_group_rows() {
        let rows = vec![
            (2, Some(4), Some("user.read".to_string())),
            (2, Some(4), Some("group.read".to_string())),
            (3, None, None),
            (4, Some(3), Some("report.view".to_string())),
        ];
        let groups = fold_group_rows(rows);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].roles[0].permissions.len(), 2);
        assert!(groups[1].roles.is_empty());
        assert_eq!(groups[2].roles[0].role_id, 3);
    }
}
