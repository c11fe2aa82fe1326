pub mod metrics;

pub use metrics::{MetricsMiddleware, PerformanceMonitor};
