use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::middleware::metrics::{PerformanceMonitor, RequestMetrics};
use crate::response;
use crate::service::RbacServices;

/// 健康检查响应 / Health check body
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` / `degraded` / `unhealthy`
    pub status: String,
    pub timestamp: String,
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub backend: String,
    pub up: bool,
}

/// 存储不可用为 503；缓存不可用只算降级，接口仍然可用
/// Store down is 503; cache down is only degraded since reads fall back to the store
#[utoipa::path(
    get,
    path = "/health",
    tag = "Metrics",
    responses(
        (status = 200, description = "Service healthy or degraded", body = HealthResponse),
        (status = 503, description = "Store unavailable", body = HealthResponse)
    )
)]
pub async fn health_check(svc: web::Data<RbacServices>) -> HttpResponse {
    let store_up = match svc.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "存储健康检查失败 / store health check failed");
            false
        }
    };
    let cache_up = svc.cache.ping().await;

    let status = match (store_up, cache_up) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        (false, _) => "unhealthy",
    };
    let body = HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        store: ComponentHealth {
            backend: svc.store.backend().to_string(),
            up: store_up,
        },
        cache: ComponentHealth {
            backend: svc.cache.backend().to_string(),
            up: cache_up,
        },
    };
    if store_up {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// 请求指标 / Request metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "Metrics",
    responses((status = 200, description = "Request metrics", body = RequestMetrics))
)]
pub async fn get_metrics(monitor: web::Data<PerformanceMonitor>) -> HttpResponse {
    response::ok(monitor.snapshot())
}
