use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::model::{CreateUserRequest, EffectivePermissions, UpdateUserRequest, User, UserFilter};
use crate::response::{self, ApiResponse};
use crate::service::RbacServices;

/// 用户接口注册
/// Register user endpoints
pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_users))
            .route(web::post().to(create_user)),
    )
    .service(
        web::resource(format!("{}/{{id}}", path))
            .route(web::get().to(get_user))
            .route(web::put().to(update_user))
            .route(web::delete().to(delete_user)),
    )
    .service(
        web::resource(format!("{}/{{id}}/permissions", path))
            .route(web::get().to(get_user_permissions)),
    );
}

/// 分页查询用户
/// List users with optional filters
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(UserFilter),
    responses((status = 200, description = "Paged users", body = [User]))
)]
pub async fn list_users(
    svc: web::Data<RbacServices>,
    filter: web::Query<UserFilter>,
) -> AppResult<HttpResponse> {
    let page = svc.users.list(&filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paged(page)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    Ok(response::ok(svc.users.get(id.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation failed or username/email taken")
    )
)]
pub async fn create_user(
    svc: web::Data<RbacServices>,
    body: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    let user = svc.users.create(body.into_inner()).await?;
    Ok(response::created(user, "User created successfully"))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
) -> AppResult<HttpResponse> {
    let user = svc.users.update(id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(user, "User updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    svc.users.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("User deleted successfully")))
}

/// 用户的有效权限（直接角色 + 组继承）
/// Effective permissions of a user (direct roles plus group inheritance)
#[utoipa::path(
    get,
    path = "/api/users/{id}/permissions",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissions),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_permissions(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let permissions = svc
        .resolver
        .resolve_effective_permissions(id.into_inner())
        .await?;
    Ok(response::ok(permissions))
}
