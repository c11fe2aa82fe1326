/// 通用模块：配置与日志
/// Common module: configuration and tracing

pub mod config;
pub mod config_validator;
pub mod enhanced_config;
pub mod tracing;

pub use config_validator::AppConfiguration;
pub use enhanced_config::EnhancedConfigManager;
