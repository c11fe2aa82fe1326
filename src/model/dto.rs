//! 请求 DTO 与校验规则
//! Request DTOs and their validation rules

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::model::page::PageRequest;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap();
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        return Ok(());
    }
    let mut err = ValidationError::new("username_format");
    err.message = Some(
        "Username can only contain alphanumeric characters, dots, hyphens, and underscores".into(),
    );
    Err(err)
}

fn default_true() -> bool {
    true
}

// ---------- 用户 / users ----------

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 100, message = "Username must be 1-100 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 200, message = "Email cannot exceed 200 characters")
    )]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = 100, message = "Username must be 1-100 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 200, message = "Email cannot exceed 200 characters")
    )]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl UserFilter {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page_number, self.page_size)
    }
}

// ---------- 用户组 / groups ----------

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 150, message = "Group name must be 1-150 characters"))]
    pub group_name: String,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 150, message = "Group name must be 1-150 characters"))]
    pub group_name: Option<String>,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GroupFilter {
    pub group_name: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl GroupFilter {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page_number, self.page_size)
    }
}

// ---------- 角色 / roles ----------

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    pub role_name: String,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    pub role_name: Option<String>,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RoleFilter {
    pub role_name: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl RoleFilter {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page_number, self.page_size)
    }
}

// ---------- 权限 / permissions ----------

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Permission name must be 1-150 characters"
    ))]
    pub permission_name: String,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Permission name must be 1-150 characters"
    ))]
    pub permission_name: Option<String>,
    #[validate(length(max = 300, message = "Description cannot exceed 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PermissionFilter {
    pub permission_name: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl PermissionFilter {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page_number, self.page_size)
    }
}

// ---------- 分配 / assignments ----------

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleToUserRequest {
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
    #[validate(range(min = 1, message = "Role id must be positive"))]
    pub role_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleToGroupRequest {
    #[validate(range(min = 1, message = "Group id must be positive"))]
    pub group_id: i64,
    #[validate(range(min = 1, message = "Role id must be positive"))]
    pub role_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserToGroupRequest {
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
    #[validate(range(min = 1, message = "Group id must be positive"))]
    pub group_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionToRoleRequest {
    #[validate(range(min = 1, message = "Role id must be positive"))]
    pub role_id: i64,
    #[validate(range(min = 1, message = "Permission id must be positive"))]
    pub permission_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignRolesToUserRequest {
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
    #[validate(length(min = 1, message = "At least one role id is required"))]
    pub role_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignUsersToGroupRequest {
    #[validate(range(min = 1, message = "Group id must be positive"))]
    pub group_id: i64,
    #[validate(length(min = 1, message = "At least one user id is required"))]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignPermissionsToRoleRequest {
    #[validate(range(min = 1, message = "Role id must be positive"))]
    pub role_id: i64,
    #[validate(length(min = 1, message = "At least one permission id is required"))]
    pub permission_ids: Vec<i64>,
}
