//! 日志初始化 / Tracing initialisation

use anyhow::{anyhow, Result};
use chrono::{Datelike, Timelike};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::comm::config_validator::LoggingSettings;

/// 本地时间，精确到百分之一秒
struct LogTimer;

impl fmt::time::FormatTime for LogTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(
            w,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:02}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis() / 10
        )
    }
}

/// `RUST_LOG` 优先，否则使用配置中的级别
/// `RUST_LOG` wins, otherwise the configured level applies
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("{},sqlx=warn", level))
            .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
    })
}

/// 初始化全局日志订阅器；重复调用返回错误
/// Install the global subscriber; a second call returns an error
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = build_filter(&settings.level);

    if settings.json_format {
        // actix 与 sqlx 通过 log 输出的记录也转发到 tracing
        LogTracer::init().map_err(|e| anyhow!("设置 log 桥接失败: {}", e))?;
        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(
                env!("CARGO_PKG_NAME").into(),
                std::io::stdout,
            ));
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("设置日志订阅器失败: {}", e))
    } else {
        // try_init 自带 log 桥接
        fmt::SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_timer(LogTimer)
            .compact()
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow!("设置日志订阅器失败: {}", e))
    }
}
