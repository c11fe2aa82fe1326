use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    future::{ready, Ready},
    rc::Rc,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::warn;
use utoipa::ToSchema;

/// 慢请求阈值（毫秒）/ slow request threshold in milliseconds
const SLOW_REQUEST_MS: u64 = 1000;
/// 平均耗时采样窗口 / sample window for the average latency
const LATENCY_WINDOW: usize = 1000;

/// 请求指标快照
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetrics {
    pub total_requests: u64,
    /// 2xx/3xx
    pub successful_requests: u64,
    /// 4xx
    pub client_errors: u64,
    /// 5xx
    pub server_errors: u64,
    pub avg_response_time_ms: f64,
    pub max_response_time_ms: u64,
    pub requests_per_second: f64,
    pub status_code_counts: BTreeMap<u16, u64>,
    /// 按路由模板计数，如 `/api/users/{id}`
    /// Counts per route template such as `/api/users/{id}`
    pub route_counts: BTreeMap<String, u64>,
}

/// 固定容量的耗时环形缓冲区
#[derive(Debug)]
struct LatencyWindow {
    samples: Vec<u64>,
    head: usize,
}

impl LatencyWindow {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(LATENCY_WINDOW),
            head: 0,
        }
    }

    fn push(&mut self, value: u64) {
        if self.samples.len() < LATENCY_WINDOW {
            self.samples.push(value);
        } else {
            self.samples[self.head] = value;
        }
        self.head = (self.head + 1) % LATENCY_WINDOW;
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    successful: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    max_ms: AtomicU64,
}

/// 请求监控器，可在 worker 之间共享
/// Request monitor shared across workers
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    counters: Arc<Counters>,
    started: Instant,
    status_codes: Arc<RwLock<BTreeMap<u16, u64>>>,
    routes: Arc<RwLock<BTreeMap<String, u64>>>,
    latency: Arc<Mutex<LatencyWindow>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            started: Instant::now(),
            status_codes: Arc::new(RwLock::new(BTreeMap::new())),
            routes: Arc::new(RwLock::new(BTreeMap::new())),
            latency: Arc::new(Mutex::new(LatencyWindow::new())),
        }
    }

    /// 记录一次完成的请求 / Record one finished request
    pub fn record(&self, method: &str, route: &str, status: u16, elapsed_ms: u64) {
        let c = &self.counters;
        c.total.fetch_add(1, Ordering::Relaxed);
        match status {
            500.. => c.server_errors.fetch_add(1, Ordering::Relaxed),
            400..=499 => c.client_errors.fetch_add(1, Ordering::Relaxed),
            _ => c.successful.fetch_add(1, Ordering::Relaxed),
        };
        c.max_ms.fetch_max(elapsed_ms, Ordering::Relaxed);

        self.latency.lock().push(elapsed_ms);
        *self.status_codes.write().entry(status).or_insert(0) += 1;
        *self.routes.write().entry(route.to_string()).or_insert(0) += 1;

        if elapsed_ms > SLOW_REQUEST_MS {
            warn!(method, route, status, elapsed_ms, "慢请求 / slow request");
        }
    }

    pub fn snapshot(&self) -> RequestMetrics {
        let c = &self.counters;
        let total_requests = c.total.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed().as_secs_f64();
        RequestMetrics {
            total_requests,
            successful_requests: c.successful.load(Ordering::Relaxed),
            client_errors: c.client_errors.load(Ordering::Relaxed),
            server_errors: c.server_errors.load(Ordering::Relaxed),
            avg_response_time_ms: self.latency.lock().average(),
            max_response_time_ms: c.max_ms.load(Ordering::Relaxed),
            requests_per_second: if elapsed > 0.0 {
                total_requests as f64 / elapsed
            } else {
                0.0
            },
            status_code_counts: self.status_codes.read().clone(),
            route_counts: self.routes.read().clone(),
        }
    }
}

/// 请求指标中间件
pub struct MetricsMiddleware {
    monitor: PerformanceMonitor,
}

impl MetricsMiddleware {
    pub fn new(monitor: PerformanceMonitor) -> Self {
        Self { monitor }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MetricsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
            monitor: self.monitor.clone(),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
    monitor: PerformanceMonitor,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let monitor = self.monitor.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().to_string();
            // 路由模板避免按 id 产生无限多的键
            let route = req
                .match_pattern()
                .unwrap_or_else(|| "<unmatched>".to_string());

            let res = service.call(req).await?;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            monitor.record(&method, &route, res.status().as_u16(), elapsed_ms);
            Ok(res)
        })
    }
}
