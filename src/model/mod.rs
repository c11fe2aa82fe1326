//! 领域模型 / Domain model

pub mod access;
pub mod dto;
pub mod entity;
pub mod page;

pub use access::{EffectivePermissions, GroupGrant, RoleGrant, UserAccessGraph};
pub use dto::*;
pub use entity::*;
pub use page::{Page, PageRequest, PaginationMetadata};
