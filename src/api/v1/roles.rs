use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::model::{CreateRoleRequest, Role, RoleDetail, RoleFilter, UpdateRoleRequest};
use crate::response::{self, ApiResponse};
use crate::service::RbacServices;

/// 角色接口注册 / Register role endpoints
pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_roles))
            .route(web::post().to(create_role)),
    )
    .service(
        web::resource(format!("{}/{{id}}", path))
            .route(web::get().to(get_role))
            .route(web::put().to(update_role))
            .route(web::delete().to(delete_role)),
    );
}

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "Roles",
    params(RoleFilter),
    responses((status = 200, description = "Paged roles", body = [Role]))
)]
pub async fn list_roles(
    svc: web::Data<RbacServices>,
    filter: web::Query<RoleFilter>,
) -> AppResult<HttpResponse> {
    let page = svc.roles.list(&filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paged(page)))
}

/// 角色详情，包含权限列表
/// Role detail including its permissions
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "Roles",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role with permissions", body = RoleDetail),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    Ok(response::ok(svc.roles.get(id.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "Roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Validation failed or name taken")
    )
)]
pub async fn create_role(
    svc: web::Data<RbacServices>,
    body: web::Json<CreateRoleRequest>,
) -> AppResult<HttpResponse> {
    let role = svc.roles.create(body.into_inner()).await?;
    Ok(response::created(role, "Role created successfully"))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "Roles",
    params(("id" = i64, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 404, description = "Role not found")
    )
)]
pub async fn update_role(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
    body: web::Json<UpdateRoleRequest>,
) -> AppResult<HttpResponse> {
    let role = svc.roles.update(id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(role, "Role updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "Roles",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn delete_role(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    svc.roles.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Role deleted successfully")))
}
