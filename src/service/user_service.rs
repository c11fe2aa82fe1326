use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::cache::{CacheService, CacheSettings};
use crate::model::{CreateUserRequest, Page, UpdateUserRequest, User, UserFilter};
use crate::store::RbacStore;

/// 用户增删改查 / User CRUD
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RbacStore>,
    cache: CacheService,
    settings: Arc<CacheSettings>,
}

impl UserService {
    pub fn new(store: Arc<dyn RbacStore>, cache: CacheService, settings: Arc<CacheSettings>) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub async fn list(&self, filter: &UserFilter) -> ServiceResult<Page<User>> {
        Ok(self.store.list_users(filter).await?)
    }

    pub async fn get(&self, user_id: i64) -> ServiceResult<User> {
        let key = self.settings.keys.user(user_id);
        let store = self.store.clone();
        self.cache
            .get_or_load(&key, self.settings.entity_ttl, || async move {
                Ok::<_, ServiceError>(store.get_user(user_id).await?)
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn create(&self, req: CreateUserRequest) -> ServiceResult<User> {
        req.validate()?;
        let user = self.store.create_user(&req).await?;
        info!(user_id = user.user_id, "用户已创建 / user created");
        Ok(user)
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, user_id: i64, req: UpdateUserRequest) -> ServiceResult<User> {
        req.validate()?;
        let user = self
            .store
            .update_user(user_id, &req)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        self.invalidate(user_id).await;
        info!("用户已更新 / user updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64) -> ServiceResult<()> {
        if !self.store.delete_user(user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }
        self.invalidate(user_id).await;
        info!("用户已删除 / user deleted");
        Ok(())
    }

    async fn invalidate(&self, user_id: i64) {
        let keys = &self.settings.keys;
        self.cache.remove(&keys.user(user_id)).await;
        self.cache.remove(&keys.user_permissions(user_id)).await;
    }
}
