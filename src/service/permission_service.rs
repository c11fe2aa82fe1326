use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheService, CacheSettings};
use crate::model::{
    CreatePermissionRequest, Page, Permission, PermissionFilter, UpdatePermissionRequest,
};
use crate::store::RbacStore;

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    settings: Arc<CacheSettings>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RbacStore>, cache: CacheService, settings: Arc<CacheSettings>) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub async fn list(&self, filter: &PermissionFilter) -> ServiceResult<Page<Permission>> {
        Ok(self.store.list_permissions(filter).await?)
    }

    pub async fn get(&self, permission_id: i64) -> ServiceResult<Permission> {
        let key = self.settings.keys.permission(permission_id);
        let store = self.store.clone();
        self.cache
            .get_or_load(&key, self.settings.entity_ttl, || async move {
                Ok::<_, ServiceError>(store.get_permission(permission_id).await?)
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("Permission", permission_id))
    }

    #[instrument(skip(self, req), fields(permission_name = %req.permission_name))]
    pub async fn create(&self, req: CreatePermissionRequest) -> ServiceResult<Permission> {
        req.validate()?;
        let permission = self.store.create_permission(&req).await?;
        info!(
            permission_id = permission.permission_id,
            "权限已创建 / permission created"
        );
        Ok(permission)
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        permission_id: i64,
        req: UpdatePermissionRequest,
    ) -> ServiceResult<Permission> {
        req.validate()?;
        let permission = self
            .store
            .update_permission(permission_id, &req)
            .await?
            .ok_or_else(|| ServiceError::not_found("Permission", permission_id))?;
        self.invalidate(permission_id).await;
        Ok(permission)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, permission_id: i64) -> ServiceResult<()> {
        if !self.store.delete_permission(permission_id).await? {
            return Err(ServiceError::not_found("Permission", permission_id));
        }
        self.invalidate(permission_id).await;
        info!("权限已删除 / permission deleted");
        Ok(())
    }

    /// 权限名称出现在角色详情与有效权限中，两类缓存都要清掉
    /// Permission names appear in role details and effective permissions; drop both
    async fn invalidate(&self, permission_id: i64) {
        let keys = &self.settings.keys;
        self.cache.remove(&keys.permission(permission_id)).await;
        self.cache.remove_by_prefix(&keys.role).await;
        self.cache.remove_by_prefix(&keys.user_permissions).await;
    }
}
