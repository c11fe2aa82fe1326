use config::FileFormat;
use tracing::info;

use crate::comm::config::{ConfigManager, ConfigResult, ConfigSource};
use crate::comm::config_validator::{AppConfiguration, ConfigValidator, EnvironmentConfigLoader};

/// 环境变量前缀，例如 `RBAC_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "RBAC";
pub const ENV_SEPARATOR: &str = "__";

/// 增强的配置管理器：分层加载、强类型化并校验
/// Layered loading, typed deserialization and validation
pub struct EnhancedConfigManager {
    config_manager: ConfigManager,
    env_loader: EnvironmentConfigLoader,
    app_config: AppConfiguration,
}

impl EnhancedConfigManager {
    /// 从默认位置加载：config/default.toml、config/{env}.toml、config/local.toml、环境变量
    pub fn new() -> ConfigResult<Self> {
        Self::with_overrides(EnvironmentConfigLoader::new(), Vec::new())
    }

    /// 在默认配置源之后追加额外的配置源（优先级最高）
    /// Append extra sources after the defaults; they take precedence
    pub fn with_overrides(
        env_loader: EnvironmentConfigLoader,
        overrides: Vec<ConfigSource>,
    ) -> ConfigResult<Self> {
        info!("当前环境: {}", env_loader.environment());

        let mut sources: Vec<ConfigSource> = env_loader
            .config_paths()
            .into_iter()
            .map(|path| ConfigSource::File {
                required: false,
                path,
                format: Some(FileFormat::Toml),
            })
            .collect();
        sources.push(ConfigSource::Env {
            prefix: ENV_PREFIX.to_string(),
            separator: ENV_SEPARATOR,
        });
        sources.extend(overrides);

        let config_manager = ConfigManager::with_sources(sources)?;
        let app_config: AppConfiguration = config_manager.deserialize()?;
        ConfigValidator::new().validate_config(&app_config)?;
        info!("配置加载和验证成功");

        Ok(Self {
            config_manager,
            env_loader,
            app_config,
        })
    }

    pub fn app_config(&self) -> &AppConfiguration {
        &self.app_config
    }

    pub fn into_app_config(self) -> AppConfiguration {
        self.app_config
    }

    /// 打印配置摘要
    pub fn print_config_summary(&self) {
        let cfg = &self.app_config;
        info!("=== 配置摘要 ===");
        info!("环境: {}", self.env_loader.environment());
        info!("服务器: {}:{}", cfg.server.host, cfg.server.port);
        info!("工作线程: {:?}", cfg.server.workers);
        info!("日志级别: {} (JSON: {})", cfg.logging.level, cfg.logging.json_format);
        if cfg.database.is_configured() {
            info!(
                "数据库: {}",
                mask_sensitive_info(&cfg.database.connection_url())
            );
        } else {
            info!("数据库: 未配置，使用内存存储");
        }
        match &cfg.redis.url {
            Some(url) => info!("Redis: {}", mask_sensitive_info(url)),
            None => info!("Redis: 未配置，使用内存缓存"),
        }
        info!(
            "缓存TTL: 权限 {}s, 实体 {}s",
            cfg.cache.permission_ttl_seconds, cfg.cache.entity_ttl_seconds
        );
        let (total, loaded, skipped) = self.config_manager.sources_stats();
        info!("配置源: 总计 {}，已加载 {}，跳过 {}", total, loaded, skipped);
    }
}

/// 屏蔽连接串中的密码 / Hide the password part of a connection URL
pub fn mask_sensitive_info(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let auth_start = scheme_end + 3;
    let Some(at) = url[auth_start..].find('@') else {
        return url.to_string();
    };
    let auth_end = auth_start + at;
    match url[auth_start..auth_end].find(':') {
        Some(colon) => {
            let mut masked = url.to_string();
            masked.replace_range(auth_start + colon + 1..auth_end, "***");
            masked
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_and_validation() {
        let overrides = vec![ConfigSource::String {
            content: "[server]\nport = 9100\n[cache]\npermission_ttl_seconds = 60\n[cache.prefix]\nrole = \"r:\""
                .to_string(),
            format: FileFormat::Toml,
        }];
        let manager = EnhancedConfigManager::with_overrides(
            EnvironmentConfigLoader::with_environment("test"),
            overrides,
        )
        .unwrap();
        let cfg = manager.app_config();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.cache.permission_ttl_seconds, 60);
        assert_eq!(cfg.cache.prefix.role, "r:");
        assert_eq!(cfg.cache.prefix.user_permissions, "user:permissions:");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = vec![ConfigSource::String {
            content: "[server]\nport = 80".to_string(),
            format: FileFormat::Toml,
        }];
        let result = EnhancedConfigManager::with_overrides(
            EnvironmentConfigLoader::with_environment("test"),
            overrides,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mask_sensitive_info() {
        assert_eq!(
            mask_sensitive_info("postgres://admin:secret@db:5432/rbac"),
            "postgres://admin:***@db:5432/rbac"
        );
        assert_eq!(mask_sensitive_info("redis://cache:6379"), "redis://cache:6379");
    }
}
