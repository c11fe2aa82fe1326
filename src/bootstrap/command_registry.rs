use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::bootstrap::app_bootstrap::AppBootstrap;

/// 构建完整的命令行应用
pub fn build_app() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("RBAC 权限管理服务 / Role-based access control admin service")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("server")
                .about("启动 Web 服务器")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("覆盖配置中的服务器主机地址"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .value_parser(value_parser!(u16))
                        .help("覆盖配置中的服务器端口"),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("WORKERS")
                        .value_parser(value_parser!(usize))
                        .help("覆盖配置中的工作线程数"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("存储为空时写入演示数据")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("debug")
                        .short('d')
                        .long("debug")
                        .help("启用调试日志")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("migrate").about("执行数据库迁移"))
        .subcommand(Command::new("seed").about("存储为空时写入演示数据"))
        .subcommand(Command::new("version").about("显示版本信息"))
}

/// 将 `server` 子命令参数叠加到启动器上
/// Apply `server` subcommand flags on top of the loaded configuration
pub fn apply_server_args(mut bootstrap: AppBootstrap, matches: &ArgMatches) -> AppBootstrap {
    if let Some(host) = matches.get_one::<String>("host") {
        bootstrap = bootstrap.with_host(host.clone());
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        bootstrap = bootstrap.with_port(*port);
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        bootstrap = bootstrap.with_workers(*workers);
    }
    if matches.get_flag("seed") {
        bootstrap = bootstrap.with_seed(true);
    }
    bootstrap
}

pub fn version_string() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
