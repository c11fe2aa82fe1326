//! 关系分配接口 / Assignment endpoints

use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::model::{
    AssignPermissionToRoleRequest, AssignRoleToGroupRequest, AssignRoleToUserRequest,
    AssignUserToGroupRequest, BulkAssignPermissionsToRoleRequest, BulkAssignRolesToUserRequest,
    BulkAssignUsersToGroupRequest,
};
use crate::response::ApiResponse;
use crate::service::{AssignOutcome, RbacServices, RemoveOutcome, ServiceResult};

/// 分配接口注册，`path` 通常为 `/api/assignments`
/// Register assignment endpoints under `path` (usually `/api/assignments`)
pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(web::resource(format!("{}/user-role", path)).route(web::post().to(assign_role_to_user)))
        .service(
            web::resource(format!("{}/user-role/{{user_id}}/{{role_id}}", path))
                .route(web::delete().to(remove_role_from_user)),
        )
        .service(web::resource(format!("{}/group-role", path)).route(web::post().to(assign_role_to_group)))
        .service(
            web::resource(format!("{}/group-role/{{group_id}}/{{role_id}}", path))
                .route(web::delete().to(remove_role_from_group)),
        )
        .service(web::resource(format!("{}/user-group", path)).route(web::post().to(assign_user_to_group)))
        .service(
            web::resource(format!("{}/user-group/{{user_id}}/{{group_id}}", path))
                .route(web::delete().to(remove_user_from_group)),
        )
        .service(
            web::resource(format!("{}/role-permission", path))
                .route(web::post().to(assign_permission_to_role)),
        )
        .service(
            web::resource(format!("{}/role-permission/{{role_id}}/{{permission_id}}", path))
                .route(web::delete().to(remove_permission_from_role)),
        )
        .service(
            web::resource(format!("{}/bulk/user-roles", path))
                .route(web::post().to(bulk_assign_roles_to_user)),
        )
        .service(
            web::resource(format!("{}/bulk/group-users", path))
                .route(web::post().to(bulk_assign_users_to_group)),
        )
        .service(
            web::resource(format!("{}/bulk/role-permissions", path))
                .route(web::post().to(bulk_assign_permissions_to_role)),
        );
}

/// 已存在的分配按 400 返回
fn assigned(outcome: ServiceResult<AssignOutcome>, message: &str) -> AppResult<HttpResponse> {
    match outcome? {
        AssignOutcome::Assigned => Ok(HttpResponse::Ok().json(ApiResponse::with_message(true, message))),
        AssignOutcome::AlreadyExists => Err(AppError::conflict("Assignment already exists")),
    }
}

/// 不存在的分配按 404 返回
fn removed(outcome: ServiceResult<RemoveOutcome>, message: &str) -> AppResult<HttpResponse> {
    match outcome? {
        RemoveOutcome::Removed => Ok(HttpResponse::Ok().json(ApiResponse::with_message(true, message))),
        RemoveOutcome::NotFound => Err(AppError::not_found("Assignment not found")),
    }
}

#[utoipa::path(
    post,
    path = "/api/assignments/user-role",
    tag = "Assignments",
    request_body = AssignRoleToUserRequest,
    responses(
        (status = 200, description = "Role assigned to user"),
        (status = 400, description = "Assignment already exists"),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn assign_role_to_user(
    svc: web::Data<RbacServices>,
    body: web::Json<AssignRoleToUserRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    assigned(
        svc.assignments.assign_role_to_user(body.user_id, body.role_id).await,
        "Role assigned to user successfully",
    )
}

#[utoipa::path(
    delete,
    path = "/api/assignments/user-role/{user_id}/{role_id}",
    tag = "Assignments",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("role_id" = i64, Path, description = "Role id")
    ),
    responses(
        (status = 200, description = "Role removed from user"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_role_from_user(
    svc: web::Data<RbacServices>,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (user_id, role_id) = path.into_inner();
    removed(
        svc.assignments.remove_role_from_user(user_id, role_id).await,
        "Role removed from user successfully",
    )
}

#[utoipa::path(
    post,
    path = "/api/assignments/group-role",
    tag = "Assignments",
    request_body = AssignRoleToGroupRequest,
    responses(
        (status = 200, description = "Role assigned to group"),
        (status = 400, description = "Assignment already exists"),
        (status = 404, description = "Group or role not found")
    )
)]
pub async fn assign_role_to_group(
    svc: web::Data<RbacServices>,
    body: web::Json<AssignRoleToGroupRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    assigned(
        svc.assignments.assign_role_to_group(body.group_id, body.role_id).await,
        "Role assigned to group successfully",
    )
}

#[utoipa::path(
    delete,
    path = "/api/assignments/group-role/{group_id}/{role_id}",
    tag = "Assignments",
    params(
        ("group_id" = i64, Path, description = "Group id"),
        ("role_id" = i64, Path, description = "Role id")
    ),
    responses(
        (status = 200, description = "Role removed from group"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_role_from_group(
    svc: web::Data<RbacServices>,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (group_id, role_id) = path.into_inner();
    removed(
        svc.assignments.remove_role_from_group(group_id, role_id).await,
        "Role removed from group successfully",
    )
}

#[utoipa::path(
    post,
    path = "/api/assignments/user-group",
    tag = "Assignments",
    request_body = AssignUserToGroupRequest,
    responses(
        (status = 200, description = "User assigned to group"),
        (status = 400, description = "Assignment already exists"),
        (status = 404, description = "User or group not found")
    )
)]
pub async fn assign_user_to_group(
    svc: web::Data<RbacServices>,
    body: web::Json<AssignUserToGroupRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    assigned(
        svc.assignments.assign_user_to_group(body.user_id, body.group_id).await,
        "User assigned to group successfully",
    )
}

#[utoipa::path(
    delete,
    path = "/api/assignments/user-group/{user_id}/{group_id}",
    tag = "Assignments",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("group_id" = i64, Path, description = "Group id")
    ),
    responses(
        (status = 200, description = "User removed from group"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_user_from_group(
    svc: web::Data<RbacServices>,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (user_id, group_id) = path.into_inner();
    removed(
        svc.assignments.remove_user_from_group(user_id, group_id).await,
        "User removed from group successfully",
    )
}

#[utoipa::path(
    post,
    path = "/api/assignments/role-permission",
    tag = "Assignments",
    request_body = AssignPermissionToRoleRequest,
    responses(
        (status = 200, description = "Permission assigned to role"),
        (status = 400, description = "Assignment already exists"),
        (status = 404, description = "Role or permission not found")
    )
)]
pub async fn assign_permission_to_role(
    svc: web::Data<RbacServices>,
    body: web::Json<AssignPermissionToRoleRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    assigned(
        svc.assignments
            .assign_permission_to_role(body.role_id, body.permission_id)
            .await,
        "Permission assigned to role successfully",
    )
}

#[utoipa::path(
    delete,
    path = "/api/assignments/role-permission/{role_id}/{permission_id}",
    tag = "Assignments",
    params(
        ("role_id" = i64, Path, description = "Role id"),
        ("permission_id" = i64, Path, description = "Permission id")
    ),
    responses(
        (status = 200, description = "Permission removed from role"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_permission_from_role(
    svc: web::Data<RbacServices>,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (role_id, permission_id) = path.into_inner();
    removed(
        svc.assignments
            .remove_permission_from_role(role_id, permission_id)
            .await,
        "Permission removed from role successfully",
    )
}

/// 批量为用户分配角色，返回新增数量
/// Bulk-assign roles to a user, returning how many were new
#[utoipa::path(
    post,
    path = "/api/assignments/bulk/user-roles",
    tag = "Assignments",
    request_body = BulkAssignRolesToUserRequest,
    responses(
        (status = 200, description = "Number of newly assigned roles", body = u64),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn bulk_assign_roles_to_user(
    svc: web::Data<RbacServices>,
    body: web::Json<BulkAssignRolesToUserRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let count = svc
        .assignments
        .bulk_assign_roles_to_user(body.user_id, &body.role_ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        count,
        format!("{} roles assigned successfully", count),
    )))
}

#[utoipa::path(
    post,
    path = "/api/assignments/bulk/group-users",
    tag = "Assignments",
    request_body = BulkAssignUsersToGroupRequest,
    responses(
        (status = 200, description = "Number of newly added members", body = u64),
        (status = 404, description = "Group or user not found")
    )
)]
pub async fn bulk_assign_users_to_group(
    svc: web::Data<RbacServices>,
    body: web::Json<BulkAssignUsersToGroupRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let count = svc
        .assignments
        .bulk_assign_users_to_group(body.group_id, &body.user_ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        count,
        format!("{} users assigned successfully", count),
    )))
}

#[utoipa::path(
    post,
    path = "/api/assignments/bulk/role-permissions",
    tag = "Assignments",
    request_body = BulkAssignPermissionsToRoleRequest,
    responses(
        (status = 200, description = "Number of newly granted permissions", body = u64),
        (status = 404, description = "Role or permission not found")
    )
)]
pub async fn bulk_assign_permissions_to_role(
    svc: web::Data<RbacServices>,
    body: web::Json<BulkAssignPermissionsToRoleRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;
    let count = svc
        .assignments
        .bulk_assign_permissions_to_role(body.role_id, &body.permission_ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        count,
        format!("{} permissions assigned successfully", count),
    )))
}
