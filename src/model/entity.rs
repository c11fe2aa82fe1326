//! 实体与关系边
//! Entities and assignment edges
//!
//! 实体只持有自身的标量字段，关系通过独立的边记录表达
//! Entities own only their scalar fields; relationships live in separate edge records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// 用户 / User
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 用户组 / Group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: i64,
    pub group_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 角色 / Role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: i64,
    pub role_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 权限 / Permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub permission_id: i64,
    pub permission_name: String,
    pub description: Option<String>,
}

/// 角色详情（含已授予的权限）
/// Role read model with its granted permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    pub role_id: i64,
    pub role_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub permissions: Vec<Permission>,
}

impl RoleDetail {
    pub fn new(role: Role, permissions: Vec<Permission>) -> Self {
        Self {
            role_id: role.role_id,
            role_name: role.role_name,
            description: role.description,
            created_at: role.created_at,
            permissions,
        }
    }
}

/// 实体类型 / Entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Role,
    Permission,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Group => "Group",
            EntityKind::Role => "Role",
            EntityKind::Permission => "Permission",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 四种多对多关系 / The four many-to-many relations
///
/// `left` 为关系中固定的一侧（批量操作的键），`right` 为被分配的一侧
/// `left` is the owning side (the bulk key), `right` is the assigned side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    UserRole,
    GroupRole,
    UserGroup,
    RolePermission,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::UserRole,
        EdgeKind::GroupRole,
        EdgeKind::UserGroup,
        EdgeKind::RolePermission,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EdgeKind::UserRole => "user_roles",
            EdgeKind::GroupRole => "group_roles",
            EdgeKind::UserGroup => "user_groups",
            EdgeKind::RolePermission => "role_permissions",
        }
    }

    pub fn left_column(&self) -> &'static str {
        match self {
            EdgeKind::UserRole | EdgeKind::UserGroup => "user_id",
            EdgeKind::GroupRole => "group_id",
            EdgeKind::RolePermission => "role_id",
        }
    }

    pub fn right_column(&self) -> &'static str {
        match self {
            EdgeKind::UserRole | EdgeKind::GroupRole => "role_id",
            EdgeKind::UserGroup => "group_id",
            EdgeKind::RolePermission => "permission_id",
        }
    }

    pub fn left_entity(&self) -> EntityKind {
        match self {
            EdgeKind::UserRole | EdgeKind::UserGroup => EntityKind::User,
            EdgeKind::GroupRole => EntityKind::Group,
            EdgeKind::RolePermission => EntityKind::Role,
        }
    }

    pub fn right_entity(&self) -> EntityKind {
        match self {
            EdgeKind::UserRole | EdgeKind::GroupRole => EntityKind::Role,
            EdgeKind::UserGroup => EntityKind::Group,
            EdgeKind::RolePermission => EntityKind::Permission,
        }
    }

    /// role_permissions 没有分配时间列
    /// role_permissions carries no assignment timestamp
    pub fn has_assigned_at(&self) -> bool {
        !matches!(self, EdgeKind::RolePermission)
    }

    /// 该关系是否引用此类实体 / whether this relation references the entity kind
    pub fn touches(&self, entity: EntityKind) -> bool {
        self.left_entity() == entity || self.right_entity() == entity
    }

    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::UserRole => "user-role",
            EdgeKind::GroupRole => "group-role",
            EdgeKind::UserGroup => "user-group",
            EdgeKind::RolePermission => "role-permission",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 边的复合键 / Composite key of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub left: i64,
    pub right: i64,
}

impl EdgeKey {
    pub fn new(left: i64, right: i64) -> Self {
        Self { left, right }
    }
}

/// 一条边记录 / One stored edge
///
/// 只有 role-permission 边没有分配时间 / only role-permission edges carry no timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub key: EdgeKey,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Edge {
    /// 带时间戳的边缺失时间时退回纪元时间，存储层保证不会发生
    fn assigned_at_or_epoch(&self) -> DateTime<Utc> {
        self.assigned_at.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: i64,
    pub role_id: i64,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupRole {
    pub group_id: i64,
    pub role_id: i64,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub user_id: i64,
    pub group_id: i64,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub role_id: i64,
    pub permission_id: i64,
}

impl From<&Edge> for UserRole {
    fn from(edge: &Edge) -> Self {
        Self {
            user_id: edge.key.left,
            role_id: edge.key.right,
            assigned_at: edge.assigned_at_or_epoch(),
        }
    }
}

impl From<&Edge> for GroupRole {
    fn from(edge: &Edge) -> Self {
        Self {
            group_id: edge.key.left,
            role_id: edge.key.right,
            assigned_at: edge.assigned_at_or_epoch(),
        }
    }
}

impl From<&Edge> for UserGroup {
    fn from(edge: &Edge) -> Self {
        Self {
            user_id: edge.key.left,
            group_id: edge.key.right,
            assigned_at: edge.assigned_at_or_epoch(),
        }
    }
}

impl From<&Edge> for RolePermission {
    fn from(edge: &Edge) -> Self {
        Self {
            role_id: edge.key.left,
            permission_id: edge.key.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_columns_follow_left_right_entities() {
        for kind in EdgeKind::ALL {
            let left = kind.left_entity().name().to_lowercase();
            let right = kind.right_entity().name().to_lowercase();
            assert_eq!(kind.left_column(), format!("{}_id", left));
            assert_eq!(kind.right_column(), format!("{}_id", right));
        }
    }

    #[test]
    fn test_timestamped_edges_always_carry_assigned_at() {
        let at = Utc::now();
        let edge = Edge {
            key: EdgeKey::new(3, 5),
            assigned_at: Some(at),
        };
        let user_role = UserRole::from(&edge);
        assert_eq!((user_role.user_id, user_role.role_id), (3, 5));
        assert_eq!(user_role.assigned_at, at);
        assert_eq!(GroupRole::from(&edge).assigned_at, at);
        assert_eq!(UserGroup::from(&edge).assigned_at, at);

        let json = serde_json::to_value(&user_role).unwrap();
        assert!(json["assignedAt"].is_string());
        let json = serde_json::to_value(RolePermission::from(&edge)).unwrap();
        assert!(json.get("assignedAt").is_none());
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User {
            user_id: 7,
            username: "jane.smith".into(),
            email: "jane@example.com".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["isActive"], true);
        assert!(json.get("createdAt").is_some());
    }
}
