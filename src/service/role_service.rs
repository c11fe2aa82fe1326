use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheService, CacheSettings};
use crate::model::{CreateRoleRequest, Page, Role, RoleDetail, RoleFilter, UpdateRoleRequest};
use crate::store::RbacStore;

#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    settings: Arc<CacheSettings>,
}

impl RoleService {
    pub fn new(store: Arc<dyn RbacStore>, cache: CacheService, settings: Arc<CacheSettings>) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub async fn list(&self, filter: &RoleFilter) -> ServiceResult<Page<Role>> {
        Ok(self.store.list_roles(filter).await?)
    }

    /// 角色详情包含其权限列表，以 `role:{id}` 缓存
    /// Role detail with its permissions, cached under `role:{id}`
    pub async fn get(&self, role_id: i64) -> ServiceResult<RoleDetail> {
        let key = self.settings.keys.role(role_id);
        let store = self.store.clone();
        self.cache
            .get_or_load(&key, self.settings.entity_ttl, || async move {
                let Some(role) = store.get_role(role_id).await? else {
                    return Ok::<_, ServiceError>(None);
                };
                let permissions = store.role_permissions(role_id).await?;
                Ok(Some(RoleDetail::new(role, permissions)))
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", role_id))
    }

    #[instrument(skip(self, req), fields(role_name = %req.role_name))]
    pub async fn create(&self, req: CreateRoleRequest) -> ServiceResult<Role> {
        req.validate()?;
        let role = self.store.create_role(&req).await?;
        info!(role_id = role.role_id, "角色已创建 / role created");
        Ok(role)
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, role_id: i64, req: UpdateRoleRequest) -> ServiceResult<Role> {
        req.validate()?;
        let role = self
            .store
            .update_role(role_id, &req)
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", role_id))?;
        self.invalidate(role_id).await;
        Ok(role)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, role_id: i64) -> ServiceResult<()> {
        if !self.store.delete_role(role_id).await? {
            return Err(ServiceError::not_found("Role", role_id));
        }
        self.invalidate(role_id).await;
        info!("角色已删除 / role deleted");
        Ok(())
    }

    async fn invalidate(&self, role_id: i64) {
        let keys = &self.settings.keys;
        self.cache.remove(&keys.role(role_id)).await;
        self.cache.remove_by_prefix(&keys.user_permissions).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::model::{CreatePermissionRequest, EdgeKey, EdgeKind};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_get_returns_permissions() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let svc = RoleService::new(
            Arc::new(store.clone()),
            CacheService::new(Arc::new(cache.clone())),
            Arc::new(CacheSettings::default()),
        );
        let role = svc
            .create(CreateRoleRequest {
                role_name: "Auditor".into(),
                description: None,
            })
            .await
            .unwrap();
        for name in ["report.view", "report.export"] {
            let p = store
                .create_permission(&CreatePermissionRequest {
                    permission_name: name.into(),
                    description: None,
                })
                .await
                .unwrap();
            store
                .insert_edge(EdgeKind::RolePermission, EdgeKey::new(role.role_id, p.permission_id))
                .await
                .unwrap();
        }

        let detail = svc.get(role.role_id).await.unwrap();
        assert_eq!(detail.role_name, "Auditor");
        assert_eq!(detail.permissions.len(), 2);
        assert!(cache.contains_key("role:1"));

        svc.delete(role.role_id).await.unwrap();
        assert!(!cache.contains_key("role:1"));
    }

    #[tokio::test]
    async fn test_rename_conflict() {
        let svc = RoleService::new(
            Arc::new(MemoryStore::new()),
            CacheService::new(Arc::new(MemoryCache::new())),
            Arc::new(CacheSettings::default()),
        );
        for name in ["A", "B"] {
            svc.create(CreateRoleRequest {
                role_name: name.into(),
                description: None,
            })
            .await
            .unwrap();
        }
        let err = svc
            .update(
                2,
                UpdateRoleRequest {
                    role_name: Some("A".into()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
