use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheService, CacheSettings};
use crate::model::{CreateGroupRequest, Group, GroupFilter, Page, UpdateGroupRequest};
use crate::store::RbacStore;

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    settings: Arc<CacheSettings>,
}

impl GroupService {
    pub fn new(store: Arc<dyn RbacStore>, cache: CacheService, settings: Arc<CacheSettings>) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub async fn list(&self, filter: &GroupFilter) -> ServiceResult<Page<Group>> {
        Ok(self.store.list_groups(filter).await?)
    }

    pub async fn get(&self, group_id: i64) -> ServiceResult<Group> {
        let key = self.settings.keys.group(group_id);
        let store = self.store.clone();
        self.cache
            .get_or_load(&key, self.settings.entity_ttl, || async move {
                Ok::<_, ServiceError>(store.get_group(group_id).await?)
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("Group", group_id))
    }

    #[instrument(skip(self, req), fields(group_name = %req.group_name))]
    pub async fn create(&self, req: CreateGroupRequest) -> ServiceResult<Group> {
        req.validate()?;
        let group = self.store.create_group(&req).await?;
        info!(group_id = group.group_id, "组已创建 / group created");
        Ok(group)
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, group_id: i64, req: UpdateGroupRequest) -> ServiceResult<Group> {
        req.validate()?;
        let group = self
            .store
            .update_group(group_id, &req)
            .await?
            .ok_or_else(|| ServiceError::not_found("Group", group_id))?;
        self.cache.remove(&self.settings.keys.group(group_id)).await;
        Ok(group)
    }

    /// 删除组会级联移除成员关系与组角色，因此所有有效权限缓存都可能过期
    /// Deleting a group cascades its memberships and roles, so any cached
    /// effective permissions may be stale
    #[instrument(skip(self))]
    pub async fn delete(&self, group_id: i64) -> ServiceResult<()> {
        if !self.store.delete_group(group_id).await? {
            return Err(ServiceError::not_found("Group", group_id));
        }
        let keys = &self.settings.keys;
        self.cache.remove(&keys.group(group_id)).await;
        self.cache.remove_by_prefix(&keys.user_permissions).await;
        info!("组已删除 / group deleted");
        Ok(())
    }
}
