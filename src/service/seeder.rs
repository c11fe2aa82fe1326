//! 演示数据 / Demo dataset
//!
//! 仅当存储中没有任何用户时写入，可重复调用。
//! Only written when the store has no users; safe to call repeatedly.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{ServiceError, ServiceResult};
use crate::model::{
    CreateGroupRequest, CreatePermissionRequest, CreateRoleRequest, CreateUserRequest, EdgeKey,
    EdgeKind,
};
use crate::store::RbacStore;

const USERS: &[(&str, &str, bool)] = &[
    ("admin", "admin@example.com", true),
    ("john.doe", "john.doe@example.com", true),
    ("jane.smith", "jane.smith@example.com", true),
    ("bob.wilson", "bob.wilson@example.com", true),
    ("alice.johnson", "alice.johnson@example.com", false),
];

const GROUPS: &[(&str, &str)] = &[
    ("Engineering", "Engineering team"),
    ("Sales", "Sales team"),
    ("HR", "Human resources"),
    ("Management", "Management team"),
];

const PERMISSIONS: &[(&str, &str)] = &[
    ("user.read", "View users"),
    ("user.write", "Create and update users"),
    ("user.delete", "Delete users"),
    ("group.read", "View groups"),
    ("group.write", "Create and update groups"),
    ("group.delete", "Delete groups"),
    ("role.read", "View roles"),
    ("role.write", "Create and update roles"),
    ("role.delete", "Delete roles"),
    ("permission.read", "View permissions"),
    ("permission.write", "Create and update permissions"),
    ("permission.delete", "Delete permissions"),
    ("report.view", "View reports"),
    ("report.export", "Export reports"),
    ("settings.manage", "Manage system settings"),
];

/// 角色及其权限（按 PERMISSIONS 中的序号，从 1 开始）
/// Roles and their permissions as 1-based positions in PERMISSIONS
const ROLES: &[(&str, &str, &[usize])] = &[
    (
        "Super Admin",
        "Full system access",
        &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    ),
    ("Admin", "Administrative access", &[1, 2, 4, 5, 7, 8, 13, 14]),
    ("Manager", "Team management", &[1, 2, 4, 13, 14]),
    ("User", "Standard access", &[1, 4, 13]),
    ("Viewer", "Read-only access", &[1, 4, 7, 10]),
];

const USER_ROLES: &[(&str, &str)] = &[
    ("admin", "Super Admin"),
    ("john.doe", "Admin"),
    ("jane.smith", "Manager"),
    ("bob.wilson", "User"),
    ("alice.johnson", "Viewer"),
];

const USER_GROUPS: &[(&str, &str)] = &[
    ("admin", "Management"),
    ("john.doe", "Engineering"),
    ("jane.smith", "Sales"),
    ("jane.smith", "Management"),
    ("bob.wilson", "Engineering"),
    ("alice.johnson", "HR"),
];

const GROUP_ROLES: &[(&str, &str)] = &[
    ("Engineering", "User"),
    ("Sales", "User"),
    ("HR", "Viewer"),
    ("Management", "Manager"),
];

/// 写入结果统计 / What a seeding run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub groups: usize,
    pub roles: usize,
    pub permissions: usize,
    pub edges: u64,
}

pub struct DataSeeder {
    store: Arc<dyn RbacStore>,
}

impl DataSeeder {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// 存储为空时写入演示数据，否则返回 `None`
    /// Seed when the store is empty, otherwise return `None`
    #[instrument(skip(self))]
    pub async fn seed_if_empty(&self) -> ServiceResult<Option<SeedReport>> {
        let counts = self.store.counts().await?;
        if counts.users > 0 {
            info!(users = counts.users, "存储非空，跳过演示数据 / store not empty, skipping seed");
            return Ok(None);
        }
        let report = self.seed().await?;
        info!(?report, "演示数据已写入 / demo data seeded");
        Ok(Some(report))
    }

    async fn seed(&self) -> ServiceResult<SeedReport> {
        let mut report = SeedReport::default();

        let mut users = HashMap::new();
        for (username, email, is_active) in USERS {
            let user = self
                .store
                .create_user(&CreateUserRequest {
                    username: username.to_string(),
                    email: email.to_string(),
                    is_active: *is_active,
                })
                .await?;
            users.insert(*username, user.user_id);
        }
        report.users = users.len();

        let mut groups = HashMap::new();
        for (name, description) in GROUPS {
            let group = self
                .store
                .create_group(&CreateGroupRequest {
                    group_name: name.to_string(),
                    description: Some(description.to_string()),
                })
                .await?;
            groups.insert(*name, group.group_id);
        }
        report.groups = groups.len();

        let mut permission_ids = Vec::with_capacity(PERMISSIONS.len());
        for (name, description) in PERMISSIONS {
            let permission = self
                .store
                .create_permission(&CreatePermissionRequest {
                    permission_name: name.to_string(),
                    description: Some(description.to_string()),
                })
                .await?;
            permission_ids.push(permission.permission_id);
        }
        report.permissions = permission_ids.len();

        let mut roles = HashMap::new();
        for (name, description, positions) in ROLES {
            let role = self
                .store
                .create_role(&CreateRoleRequest {
                    role_name: name.to_string(),
                    description: Some(description.to_string()),
                })
                .await?;
            roles.insert(*name, role.role_id);
            let keys: Vec<EdgeKey> = positions
                .iter()
                .filter_map(|pos| permission_ids.get(pos - 1))
                .map(|pid| EdgeKey::new(role.role_id, *pid))
                .collect();
            report.edges += self.store.insert_edges(EdgeKind::RolePermission, &keys).await?;
        }
        report.roles = roles.len();

        report.edges += self
            .link(EdgeKind::UserRole, USER_ROLES, &users, &roles)
            .await?;
        report.edges += self
            .link(EdgeKind::UserGroup, USER_GROUPS, &users, &groups)
            .await?;
        report.edges += self
            .link(EdgeKind::GroupRole, GROUP_ROLES, &groups, &roles)
            .await?;

        Ok(report)
    }

    async fn link(
        &self,
        kind: EdgeKind,
        pairs: &[(&str, &str)],
        left: &HashMap<&str, i64>,
        right: &HashMap<&str, i64>,
    ) -> ServiceResult<u64> {
        let mut keys = Vec::with_capacity(pairs.len());
        for (l, r) in pairs {
            let (Some(l), Some(r)) = (left.get(l), right.get(r)) else {
                return Err(ServiceError::NotFound(format!(
                    "seed {} references unknown {} / {}",
                    kind, l, r
                )));
            };
            keys.push(EdgeKey::new(*l, *r));
        }
        Ok(self.store.insert_edges(kind, &keys).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_once() {
        let store = MemoryStore::new();
        let seeder = DataSeeder::new(Arc::new(store.clone()));
        let report = seeder.seed_if_empty().await.unwrap().unwrap();
        assert_eq!(report.users, 5);
        assert_eq!(report.permissions, 15);
        // 15 + 8 + 5 + 3 + 4 role permissions, 5 user roles, 6 memberships, 4 group roles
        assert_eq!(report.edges, 35 + 5 + 6 + 4);
        assert!(seeder.seed_if_empty().await.unwrap().is_none());
        assert_eq!(store.counts().await.unwrap().users, 5);
    }
}
