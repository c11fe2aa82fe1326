use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::model::{CreateGroupRequest, Group, GroupFilter, UpdateGroupRequest};
use crate::response::{self, ApiResponse};
use crate::service::RbacServices;

/// 组接口注册 / Register group endpoints
pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(
        web::resource(path)
            .route(web::get().to(list_groups))
            .route(web::post().to(create_group)),
    )
    .service(
        web::resource(format!("{}/{{id}}", path))
            .route(web::get().to(get_group))
            .route(web::put().to(update_group))
            .route(web::delete().to(delete_group)),
    );
}

#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "Groups",
    params(GroupFilter),
    responses((status = 200, description = "Paged groups", body = [Group]))
)]
pub async fn list_groups(
    svc: web::Data<RbacServices>,
    filter: web::Query<GroupFilter>,
) -> AppResult<HttpResponse> {
    let page = svc.groups.list(&filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paged(page)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{id}",
    tag = "Groups",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Group not found")
    )
)]
pub async fn get_group(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    Ok(response::ok(svc.groups.get(id.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "Groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Validation failed or name taken")
    )
)]
pub async fn create_group(
    svc: web::Data<RbacServices>,
    body: web::Json<CreateGroupRequest>,
) -> AppResult<HttpResponse> {
    let group = svc.groups.create(body.into_inner()).await?;
    Ok(response::created(group, "Group created successfully"))
}

#[utoipa::path(
    put,
    path = "/api/groups/{id}",
    tag = "Groups",
    params(("id" = i64, Path, description = "Group id")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = Group),
        (status = 404, description = "Group not found")
    )
)]
pub async fn update_group(
    svc: web::Data<RbacServices>,
    id: web::Path<i64>,
    body: web::Json<UpdateGroupRequest>,
) -> AppResult<HttpResponse> {
    let group = svc.groups.update(id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(group, "Group updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    tag = "Groups",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn delete_group(svc: web::Data<RbacServices>, id: web::Path<i64>) -> AppResult<HttpResponse> {
    svc.groups.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Group deleted successfully")))
}
