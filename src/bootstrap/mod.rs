pub mod app_bootstrap;
pub mod command_registry;

pub use app_bootstrap::AppBootstrap;
pub use command_registry::{apply_server_args, build_app, version_string};
