//! RBAC 权限管理服务
//! Role-based access control administration service

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod comm;
pub mod conf;
pub mod db;
pub mod error;
pub mod middleware;
pub mod model;
pub mod response;
pub mod service;
pub mod store;

pub use bootstrap::{build_app, AppBootstrap};
pub use error::{AppError, AppResult};
pub use service::RbacServices;
