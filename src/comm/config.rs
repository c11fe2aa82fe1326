use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },
    #[error("配置格式错误: {message}")]
    FormatError { message: String },
    #[error("配置项 '{key}' 不存在")]
    KeyNotFound { key: String },
    #[error("配置项 '{key}' 校验失败: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn invalid<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置数据源信息
#[derive(Debug, Clone)]
pub struct ConfigSourceInfo {
    pub source_type: String,
    pub description: String,
    pub priority: u8,
    pub loaded: bool,
}

/// 配置源类型，按添加顺序叠加，后者覆盖前者
/// Configuration sources, layered in order; later ones win
pub enum ConfigSource {
    /// 文件配置源
    File {
        path: String,
        format: Option<FileFormat>,
        required: bool,
    },
    /// 环境变量配置源，例如 `RBAC_SERVER__PORT`
    Env {
        prefix: String,
        separator: &'static str,
    },
    /// 内存配置源（嵌套的 JSON 值）
    Memory(HashMap<String, serde_json::Value>),
    /// 字符串配置源
    String { content: String, format: FileFormat },
}

fn format_name(format: &FileFormat) -> &'static str {
    match format {
        FileFormat::Toml => "TOML",
        FileFormat::Json => "JSON",
        FileFormat::Yaml => "YAML",
        _ => "Other",
    }
}

impl ConfigSource {
    pub fn source_info(&self, priority: u8) -> ConfigSourceInfo {
        let (source_type, description) = match self {
            ConfigSource::File {
                path,
                format,
                required,
            } => (
                "File",
                format!(
                    "文件配置源: {} (格式: {}, 必需: {})",
                    path,
                    format.as_ref().map_or("Auto-detect", format_name),
                    required
                ),
            ),
            ConfigSource::Env { prefix, separator } => (
                "Environment",
                format!("环境变量配置源: 前缀={}, 分隔符={}", prefix, separator),
            ),
            ConfigSource::Memory(map) => ("Memory", format!("内存配置源: {} 个配置项", map.len())),
            ConfigSource::String { format, .. } => (
                "String",
                format!("字符串配置源: 格式={}", format_name(format)),
            ),
        };
        ConfigSourceInfo {
            source_type: source_type.to_string(),
            description,
            priority,
            loaded: false,
        }
    }

    fn add_to_builder(
        self,
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> ConfigResult<ConfigBuilder<config::builder::DefaultState>> {
        Ok(match self {
            ConfigSource::File {
                path,
                format,
                required,
            } => {
                let file = match format {
                    Some(format) => File::with_name(&path).format(format),
                    None => File::with_name(&path),
                };
                builder.add_source(file.required(required))
            }
            ConfigSource::Env { prefix, separator } => builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator(separator)
                    .prefix_separator("_")
                    .try_parsing(true)
                    .ignore_empty(true),
            ),
            ConfigSource::Memory(map) => {
                let json = serde_json::to_string(&map).map_err(|e| ConfigError::FormatError {
                    message: format!("序列化内存配置失败: {}", e),
                })?;
                builder.add_source(File::from_str(&json, FileFormat::Json))
            }
            ConfigSource::String { content, format } => {
                builder.add_source(File::from_str(&content, format))
            }
        })
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: Config,
    sources_info: Vec<ConfigSourceInfo>,
}

impl ConfigManager {
    /// 使用指定的配置源创建配置管理器；可选文件不存在时跳过
    /// Build from the given sources; missing optional files are skipped
    pub fn with_sources(sources: Vec<ConfigSource>) -> ConfigResult<Self> {
        let mut builder = Config::builder();
        let mut sources_info = Vec::new();

        for (index, source) in sources.into_iter().enumerate() {
            let mut info = source.source_info(index as u8 + 1);
            if let ConfigSource::File { path, required, .. } = &source {
                if !std::path::Path::new(path).exists() {
                    if *required {
                        return Err(ConfigError::FileNotFound { path: path.clone() });
                    }
                    debug!(path = %path, "可选配置文件不存在，跳过 / optional config file absent");
                    sources_info.push(info);
                    continue;
                }
            }
            builder = source.add_to_builder(builder)?;
            info.loaded = true;
            sources_info.push(info);
        }

        let config = builder.build().map_err(|e| ConfigError::FormatError {
            message: format!("构建配置失败: {}", e),
        })?;
        Ok(Self {
            config,
            sources_info,
        })
    }

    /// 获取指定 key 的配置值
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<T> {
        self.config.get(key).map_err(|e| match e {
            config::ConfigError::NotFound(_) => ConfigError::KeyNotFound {
                key: key.to_string(),
            },
            other => ConfigError::invalid(key, other.to_string()),
        })
    }

    /// 整体反序列化为强类型配置
    /// Deserialize the whole tree into a typed configuration
    pub fn deserialize<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        self.config
            .clone()
            .try_deserialize()
            .map_err(|e| ConfigError::FormatError {
                message: e.to_string(),
            })
    }

    pub fn sources_info(&self) -> &[ConfigSourceInfo] {
        &self.sources_info
    }

    /// (总数, 已加载, 未加载)
    pub fn sources_stats(&self) -> (usize, usize, usize) {
        let total = self.sources_info.len();
        let loaded = self.sources_info.iter().filter(|info| info.loaded).count();
        (total, loaded, total - loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_sources_win() {
        let manager = ConfigManager::with_sources(vec![
            ConfigSource::String {
                content: "[server]\nport = 8080\nhost = \"0.0.0.0\"".to_string(),
                format: FileFormat::Toml,
            },
            ConfigSource::String {
                content: "[server]\nport = 9090".to_string(),
                format: FileFormat::Toml,
            },
        ])
        .unwrap();
        assert_eq!(manager.get::<u16>("server.port").unwrap(), 9090);
        assert_eq!(manager.get::<String>("server.host").unwrap(), "0.0.0.0");
    }

    #[test]
    fn test_memory_source() {
        let mut map = HashMap::new();
        map.insert("redis".to_string(), serde_json::json!({"url": "redis://cache:6379"}));
        let manager = ConfigManager::with_sources(vec![ConfigSource::Memory(map)]).unwrap();
        assert_eq!(
            manager.get::<String>("redis.url").unwrap(),
            "redis://cache:6379"
        );
        assert!(matches!(
            manager.get::<String>("database.url"),
            Err(ConfigError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_files() {
        let optional = ConfigManager::with_sources(vec![ConfigSource::File {
            path: "config/does-not-exist.toml".to_string(),
            format: Some(FileFormat::Toml),
            required: false,
        }])
        .unwrap();
        assert_eq!(optional.sources_stats(), (1, 0, 1));

        let required = ConfigManager::with_sources(vec![ConfigSource::File {
            path: "config/does-not-exist.toml".to_string(),
            format: Some(FileFormat::Toml),
            required: true,
        }]);
        assert!(matches!(required, Err(ConfigError::FileNotFound { .. })));
    }
}
