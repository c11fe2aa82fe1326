use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::{CacheKeys, CacheSettings};
use crate::comm::config::{ConfigError, ConfigResult};
use crate::db::DatabaseSettings;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub debug: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: Some(4),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// 未配置时使用内存缓存 / absent means the in-memory cache
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub permission_ttl_seconds: u64,
    pub entity_ttl_seconds: u64,
    pub prefix: CacheKeys,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            permission_ttl_seconds: 900,
            entity_ttl_seconds: 600,
            prefix: CacheKeys::default(),
        }
    }
}

impl CacheConfig {
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            permission_ttl: Duration::from_secs(self.permission_ttl_seconds),
            entity_ttl: Duration::from_secs(self.entity_ttl_seconds),
            keys: self.prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub cache: CacheConfig,
    pub logging: LoggingSettings,
}

/// 配置验证器
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// 验证整个配置
    pub fn validate_config(&self, config: &AppConfiguration) -> ConfigResult<()> {
        // 验证服务器主机
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::invalid("server.host", "服务器主机不能为空"));
        }

        // 验证端口范围
        if config.server.port < 1024 {
            return Err(ConfigError::invalid("server.port", "端口必须在1024-65535范围内"));
        }

        // 验证工作线程数
        if let Some(workers) = config.server.workers {
            if workers == 0 || workers > 32 {
                return Err(ConfigError::invalid("server.workers", "工作线程数必须在1-32范围内"));
            }
        }

        // 验证数据库连接池大小
        let max_conn = config.database.max_connections;
        if max_conn == 0 || max_conn > 100 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "数据库连接池大小必须在1-100范围内",
            ));
        }

        // 验证缓存 TTL
        for (key, ttl) in [
            ("cache.permission_ttl_seconds", config.cache.permission_ttl_seconds),
            ("cache.entity_ttl_seconds", config.cache.entity_ttl_seconds),
        ] {
            if ttl == 0 || ttl > MAX_TTL_SECONDS {
                return Err(ConfigError::invalid(key, "缓存TTL必须在1-86400秒范围内"));
            }
        }

        // 权限缓存前缀不能为空，否则按前缀失效会清掉整个缓存
        if config.cache.prefix.user_permissions.is_empty() {
            return Err(ConfigError::invalid(
                "cache.prefix.user_permissions",
                "权限缓存前缀不能为空",
            ));
        }

        // 验证日志级别
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("值必须是以下之一: {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}

/// 环境特定配置加载器
pub struct EnvironmentConfigLoader {
    environment: String,
}

impl Default for EnvironmentConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentConfigLoader {
    /// 从 `RBAC_ENV` 读取当前环境，默认 development
    pub fn new() -> Self {
        let environment = std::env::var("RBAC_ENV").unwrap_or_else(|_| "development".to_string());
        Self { environment }
    }

    pub fn with_environment<S: Into<String>>(environment: S) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// 获取环境特定的配置文件路径
    pub fn config_paths(&self) -> Vec<String> {
        vec![
            "config/default.toml".to_string(),
            format!("config/{}.toml", self.environment),
            "config/local.toml".to_string(),
        ]
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let validator = ConfigValidator::new();
        assert!(validator.validate_config(&AppConfiguration::default()).is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let validator = ConfigValidator::new();

        let mut config = AppConfiguration::default();
        config.server.port = 80;
        assert!(validator.validate_config(&config).is_err());

        let mut config = AppConfiguration::default();
        config.server.workers = Some(64);
        assert!(validator.validate_config(&config).is_err());

        let mut config = AppConfiguration::default();
        config.cache.permission_ttl_seconds = 0;
        assert!(validator.validate_config(&config).is_err());

        let mut config = AppConfiguration::default();
        config.logging.level = "verbose".into();
        assert!(validator.validate_config(&config).is_err());
    }

    #[test]
    fn test_cache_settings_from_config() {
        let settings = CacheConfig::default().settings();
        assert_eq!(settings.permission_ttl, Duration::from_secs(900));
        assert_eq!(settings.keys.role, "role:");
    }

    #[test]
    fn test_environment_paths() {
        let loader = EnvironmentConfigLoader::with_environment("staging");
        let paths = loader.config_paths();
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"config/staging.toml".to_string()));
        assert!(!loader.is_production());
    }
}
