use anyhow::{Context, Result};
use clap::{Arg, Command};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskevents_core::AppConfig;

mod app;
mod shutdown;

use app::{AppMode, Application};
use shutdown::ShutdownManager;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("taskevents")
        .version("1.0.0")
        .about("任务事件消费者系统")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("运行模式")
                .value_parser(["audit", "notification", "recurring", "all"])
                .default_value("all"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mode_str = matches.get_one::<String>("mode").unwrap();
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    info!("启动任务事件消费者系统");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }
    info!("运行模式: {mode_str}");
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("实例主机名: {host}");

    let config = AppConfig::load(config_path.map(String::as_str)).context("加载配置失败")?;
    let mode = AppMode::parse(mode_str)?;

    let shutdown = ShutdownManager::new();
    shutdown.listen_for_signals();

    let application = Application::new(config, mode);
    application
        .run(shutdown.subscribe())
        .await
        .context("运行应用失败")?;

    info!("任务事件消费者系统已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("初始化JSON日志失败")?,
        _ => registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("初始化日志失败")?,
    }

    Ok(())
}
