//! 业务服务层 / Service layer

use std::sync::Arc;
use thiserror::Error;
use validator::ValidationErrors;

use crate::cache::{CacheService, CacheSettings, CacheStore};
use crate::store::{RbacStore, StoreError};

pub mod assignment_service;
pub mod export_service;
pub mod group_service;
pub mod permission_resolver;
pub mod permission_service;
pub mod role_service;
pub mod seeder;
pub mod user_service;

pub use assignment_service::{AssignOutcome, AssignmentService, RemoveOutcome};
pub use export_service::ExportService;
pub use group_service::GroupService;
pub use permission_resolver::PermissionResolver;
pub use permission_service::PermissionService;
pub use role_service::RoleService;
pub use seeder::DataSeeder;
pub use user_service::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Store(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(kind: &str, id: i64) -> Self {
        ServiceError::NotFound(format!("{} with ID {} not found", kind, id))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Unavailable(e) => ServiceError::Store(e),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        ServiceError::Validation(messages)
    }
}

/// 全部服务的装配结果，作为 actix `web::Data` 注入
/// All services wired together; injected as actix `web::Data`
#[derive(Clone)]
pub struct RbacServices {
    pub users: UserService,
    pub groups: GroupService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub assignments: AssignmentService,
    pub resolver: PermissionResolver,
    pub export: ExportService,
    pub store: Arc<dyn RbacStore>,
    pub cache: CacheService,
}

impl RbacServices {
    pub fn new(
        store: Arc<dyn RbacStore>,
        cache_store: Arc<dyn CacheStore>,
        settings: CacheSettings,
    ) -> Self {
        let cache = CacheService::new(cache_store);
        let settings = Arc::new(settings);
        Self {
            users: UserService::new(store.clone(), cache.clone(), settings.clone()),
            groups: GroupService::new(store.clone(), cache.clone(), settings.clone()),
            roles: RoleService::new(store.clone(), cache.clone(), settings.clone()),
            permissions: PermissionService::new(store.clone(), cache.clone(), settings.clone()),
            assignments: AssignmentService::new(store.clone(), cache.clone(), settings.keys.clone()),
            resolver: PermissionResolver::new(
                store.clone(),
                cache.clone(),
                settings.keys.clone(),
                settings.permission_ttl,
            ),
            export: ExportService::new(store.clone()),
            store,
            cache,
        }
    }
}
