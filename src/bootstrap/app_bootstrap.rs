use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::comm::AppConfiguration;
use crate::conf::{init_cache, init_store};
use crate::middleware::{MetricsMiddleware, PerformanceMonitor};
use crate::service::{DataSeeder, RbacServices};
use crate::store::RbacStore;

const MAX_RETRIES: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// 应用启动器
pub struct AppBootstrap {
    config: AppConfiguration,
    migrate: bool,
}

impl AppBootstrap {
    pub fn new(config: AppConfiguration) -> Self {
        Self {
            config,
            migrate: true,
        }
    }

    /// 设置主机地址
    pub fn with_host(mut self, host: String) -> Self {
        self.config.server.host = host;
        self
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// 设置工作线程数
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.server.workers = Some(workers);
        self
    }

    /// 启动前是否写入演示数据
    pub fn with_seed(mut self, seed: bool) -> Self {
        self.config.database.seed = seed;
        self
    }

    pub fn with_migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    pub fn config(&self) -> &AppConfiguration {
        &self.config
    }

    /// 连接存储与缓存并组装服务，不启动 HTTP
    /// Connect the backends and wire the services without serving HTTP
    #[instrument(skip(self))]
    pub async fn build_services(&self) -> Result<RbacServices> {
        let store = self.init_store_with_retry().await?;
        if self.config.database.seed {
            if let Some(report) = DataSeeder::new(store.clone()).seed_if_empty().await? {
                info!(?report, "演示数据写入完成");
            }
        }
        let cache = init_cache(&self.config.redis).await?;
        info!(
            store = store.backend(),
            cache = cache.backend(),
            "后端初始化完成 / backends ready"
        );
        Ok(RbacServices::new(store, cache, self.config.cache.settings()))
    }

    /// 运行应用服务器
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        info!(
            "启动应用服务器: {}:{}",
            self.config.server.host, self.config.server.port
        );
        let services = self.build_services().await?;

        match self.start_http_server(services).await {
            Ok(()) => {
                info!("服务器已停止");
                Ok(())
            }
            Err(e) => {
                error!("服务器启动失败: {:#}", e);
                Err(e)
            }
        }
    }

    /// 带重试机制的存储初始化
    async fn init_store_with_retry(&self) -> Result<Arc<dyn RbacStore>> {
        for attempt in 1..=MAX_RETRIES {
            info!("存储初始化尝试 {}/{}", attempt, MAX_RETRIES);

            match timeout(CONNECT_TIMEOUT, init_store(&self.config.database, self.migrate)).await {
                Ok(Ok(store)) => return Ok(store),
                Ok(Err(e)) => {
                    warn!("存储初始化失败 (尝试 {}): {:#}", attempt, e);
                    if attempt == MAX_RETRIES {
                        return Err(e.context("存储初始化失败"));
                    }
                }
                Err(_) => {
                    warn!("存储初始化超时 (尝试 {})", attempt);
                    if attempt == MAX_RETRIES {
                        return Err(anyhow!("存储初始化超时"));
                    }
                }
            }

            // 指数退避
            let delay = Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
            info!("等待 {:?} 后重试", delay);
            sleep(delay).await;
        }

        Err(anyhow!("存储初始化失败"))
    }

    /// 启动HTTP服务器
    async fn start_http_server(&self, services: RbacServices) -> Result<()> {
        let server_cfg = &self.config.server;
        let monitor = PerformanceMonitor::new();
        let services = web::Data::new(services);
        let monitor_data = web::Data::new(monitor.clone());

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .wrap(MetricsMiddleware::new(monitor.clone()))
                .app_data(services.clone())
                .app_data(monitor_data.clone())
                // 通配路径以兼容静态资源与尾随斜杠
                .service(SwaggerUi::new("/swagger-ui/{_:.*}").url(
                    "/api-doc/openapi.json",
                    crate::api::swagger::ApiDoc::openapi(),
                ))
                .configure(crate::api::configure)
        });
        if let Some(workers) = server_cfg.workers {
            server = server.workers(workers);
        }

        let addr = format!("{}:{}", server_cfg.host, server_cfg.port);
        info!("服务器监听 {}", addr);
        server
            .bind(&addr)
            .with_context(|| format!("无法绑定地址 {}", addr))?
            .run()
            .await
            .context("HTTP 服务器异常退出")?;

        Ok(())
    }
}
