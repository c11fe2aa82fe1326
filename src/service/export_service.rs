//! 数据导出 / Data export

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use super::ServiceResult;
use crate::model::{Group, GroupRole, Permission, Role, RolePermission, User, UserGroup, UserRole};
use crate::store::{EntityCounts, RbacStore};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub user_groups: Vec<UserGroup>,
    pub user_roles: Vec<UserRole>,
    pub group_roles: Vec<GroupRole>,
    pub role_permissions: Vec<RolePermission>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub data: ExportData,
}

impl ExportSnapshot {
    /// 下载文件名 / attachment file name, e.g. `rbac-export-20240131-235959.json`
    pub fn file_name(&self) -> String {
        format!("rbac-export-{}.json", self.export_date.format("%Y%m%d-%H%M%S"))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub formats: Vec<String>,
    pub version: String,
    pub counts: EntityCounts,
}

#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn RbacStore>,
}

impl ExportService {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    pub async fn snapshot(&self) -> ServiceResult<ExportSnapshot> {
        let snap = self.store.snapshot().await?;
        let data = ExportData {
            user_groups: snap.user_groups.iter().map(UserGroup::from).collect(),
            user_roles: snap.user_roles.iter().map(UserRole::from).collect(),
            group_roles: snap.group_roles.iter().map(GroupRole::from).collect(),
            role_permissions: snap.role_permissions.iter().map(RolePermission::from).collect(),
            users: snap.users,
            groups: snap.groups,
            roles: snap.roles,
            permissions: snap.permissions,
        };
        info!(
            users = data.users.len(),
            roles = data.roles.len(),
            "导出快照已生成 / export snapshot built"
        );
        Ok(ExportSnapshot {
            export_date: Utc::now(),
            version: EXPORT_VERSION.to_string(),
            data,
        })
    }

    pub async fn info(&self) -> ServiceResult<ExportInfo> {
        Ok(ExportInfo {
            formats: vec!["json".to_string()],
            version: EXPORT_VERSION.to_string(),
            counts: self.store.counts().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateRoleRequest, CreateUserRequest, EdgeKey, EdgeKind};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_snapshot_contains_edges() {
        let store = MemoryStore::new();
        store
            .create_user(&CreateUserRequest {
                username: "x".into(),
                email: "x@example.com".into(),
                is_active: true,
            })
            .await
            .unwrap();
        store
            .create_role(&CreateRoleRequest {
                role_name: "R".into(),
                description: None,
            })
            .await
            .unwrap();
        store
            .insert_edge(EdgeKind::UserRole, EdgeKey::new(1, 1))
            .await
            .unwrap();

        let svc = ExportService::new(Arc::new(store));
        let snap = svc.snapshot().await.unwrap();
        assert_eq!(snap.version, "1.0");
        assert_eq!(snap.data.user_roles.len(), 1);
        assert!(snap.data.user_roles[0].assigned_at.timestamp() > 0);

        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("exportDate").is_some());
        assert!(json["data"].get("rolePermissions").is_some());

        let info = svc.info().await.unwrap();
        assert_eq!(info.formats, vec!["json"]);
        assert_eq!(info.counts.users, 1);
    }

    #[test]
    fn test_file_name() {
        let snap = ExportSnapshot {
            export_date: Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
            version: EXPORT_VERSION.to_string(),
            data: ExportData {
                users: vec![],
                groups: vec![],
                roles: vec![],
                permissions: vec![],
                user_groups: vec![],
                user_roles: vec![],
                group_roles: vec![],
                role_permissions: vec![],
            },
        };
        assert_eq!(snap.file_name(), "rbac-export-20240131-235959.json");
    }
}
