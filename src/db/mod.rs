//! 数据库连接 / Database connectivity

pub mod connection;

pub use connection::{build_pool, build_postgres_url, check_health, DatabaseSettings};
