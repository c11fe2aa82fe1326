use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::response;
use crate::service::export_service::{ExportInfo, ExportSnapshot};
use crate::service::RbacServices;

/// 导出接口注册 / Register export endpoints
pub fn register(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(web::resource(format!("{}/json", path)).route(web::get().to(export_json)))
        .service(web::resource(format!("{}/info", path)).route(web::get().to(export_info)));
}

/// 以附件形式下载全量 JSON 快照
/// Download the full JSON snapshot as an attachment
#[utoipa::path(
    get,
    path = "/api/export/json",
    tag = "Export",
    responses((status = 200, description = "JSON snapshot attachment", body = ExportSnapshot))
)]
pub async fn export_json(svc: web::Data<RbacServices>) -> AppResult<HttpResponse> {
    let snapshot = svc.export.snapshot().await?;
    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(snapshot.file_name())],
    };
    Ok(HttpResponse::Ok()
        .insert_header(disposition)
        .json(snapshot))
}

#[utoipa::path(
    get,
    path = "/api/export/info",
    tag = "Export",
    responses((status = 200, description = "Available formats and entity counts", body = ExportInfo))
)]
pub async fn export_info(svc: web::Data<RbacServices>) -> AppResult<HttpResponse> {
    Ok(response::ok(svc.export.info().await?))
}
