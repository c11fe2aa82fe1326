use anyhow::Result;
use clap::ArgMatches;
use tracing::info;

use rbac_admin::bootstrap::{apply_server_args, build_app, version_string, AppBootstrap};
use rbac_admin::comm::tracing::init_tracing;
use rbac_admin::comm::EnhancedConfigManager;
use rbac_admin::service::DataSeeder;

#[actix_web::main]
async fn main() -> Result<()> {
    let matches: ArgMatches = build_app().get_matches();

    match matches.subcommand() {
        Some(("server", sub_matches)) => handle_server_command(sub_matches).await,
        Some(("migrate", _)) => handle_migrate_command().await,
        Some(("seed", _)) => handle_seed_command().await,
        Some(("version", _)) => {
            println!("{}", version_string());
            Ok(())
        }
        _ => {
            // subcommand_required(true) 保证不会到达这里
            eprintln!("未知命令，请使用 --help 查看可用命令");
            std::process::exit(1);
        }
    }
}

/// 加载配置并初始化日志
fn load_config(debug: bool) -> Result<EnhancedConfigManager> {
    let config_manager = EnhancedConfigManager::new()?;
    let mut logging = config_manager.app_config().logging.clone();
    if debug {
        logging.level = "debug".to_string();
    }
    init_tracing(&logging)?;
    config_manager.print_config_summary();
    Ok(config_manager)
}

async fn handle_server_command(matches: &ArgMatches) -> Result<()> {
    let config_manager = load_config(matches.get_flag("debug"))?;
    let bootstrap = AppBootstrap::new(config_manager.into_app_config());
    apply_server_args(bootstrap, matches).run().await
}

async fn handle_migrate_command() -> Result<()> {
    let config = load_config(false)?.into_app_config();
    if !config.database.is_configured() {
        anyhow::bail!("未配置数据库，无法执行迁移 / no database configured");
    }
    rbac_admin::conf::init_store(&config.database, true).await?;
    info!("迁移完成");
    Ok(())
}

async fn handle_seed_command() -> Result<()> {
    let config = load_config(false)?.into_app_config();
    let store = rbac_admin::conf::init_store(&config.database, true).await?;
    match DataSeeder::new(store).seed_if_empty().await? {
        Some(report) => info!(?report, "演示数据写入完成"),
        None => info!("存储非空，未写入演示数据"),
    }
    Ok(())
}
