use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::model::{CreatePermissionRequest, Permission, PermissionFilter, UpdatePermissionRequest};
use crate::response::{self, ApiResponse};
use crate::service::RbacServices;

pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_permissions))
            .route(web::post().to(create_permission)),
    )
    .service(
        web::resource(format!("{}/{{id}}", path))
            .route(web::get().to(get_permission))
            .route(web::put().to(update_permission))
            .route(web::delete().to(delete_permission)),
    );
}

#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Permissions",
    params(PermissionFilter),
    responses((status = 200, description = "Paged permissions", body = [Permission]))
)]
pub async fn list_permissions(
    svc: web::Data<RbacServices>,
    filter: web::Query<PermissionFilter>,
) -> AppResult<HttpResponse> {
    let page = svc.permissions.list(&filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paged(page)))
}

#[utoipa::path(
    get,
    path = "/api/permissions/{id}",
    tag = "Permissions",
    params(("id" = i64, Path, description = "Permission id")),
    responses(
        (status = 200, description = "Permission", body = Permission),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn get_permission(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    Ok(response::ok(svc.permissions.get(id.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/permissions",
    tag = "Permissions",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 400, description = "Validation failed or name taken")
    )
)]
pub async fn create_permission(
    svc: web::Data<RbacServices>,
    body: web::Json<CreatePermissionRequest>,
) -> AppResult<HttpResponse> {
    let permission = svc.permissions.create(body.into_inner()).await?;
    Ok(response::created(permission, "Permission created successfully"))
}

#[utoipa::path(
    put,
    path = "/api/permissions/{id}",
    tag = "Permissions",
    params(("id" = i64, Path, description = "Permission id")),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Permission updated", body = Permission),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn update_permission(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
    body: web::Json<UpdatePermissionRequest>,
) -> AppResult<HttpResponse> {
    let permission = svc
        .permissions
        .update(id.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        permission,
        "Permission updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/permissions/{id}",
    tag = "Permissions",
    params(("id" = i64, Path, description = "Permission id")),
    responses(
        (status = 200, description = "Permission deleted"),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn delete_permission(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    svc.permissions.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Permission deleted successfully")))
}
