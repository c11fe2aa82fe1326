//! HTTP 接口 / HTTP API

use actix_web::web;

use crate::error::AppError;

pub mod metrics;
pub mod swagger;
pub mod v1;

/// 注册全部业务路由与健康检查
/// Register every API route plus the health and metrics endpoints
pub fn configure(cfg: &mut web::ServiceConfig) {
    // 请求体、路径与查询参数解析失败也走统一的错误信封
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::bad_request(err.to_string()).into()),
    );

    cfg.route("/health", web::get().to(metrics::health_check))
        .route("/api/metrics", web::get().to(metrics::get_metrics));
    v1::users::register(cfg, "/api/users");
    v1::groups::register(cfg, "/api/groups");
    v1::roles::register(cfg, "/api/roles");
    v1::permissions::register(cfg, "/api/permissions");
    v1::assignments::register(cfg, "/api/assignments");
    v1::export::register(cfg, "/api/export");
}
