/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供日志格式化的辅助函数
use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// 初始化日志
///
/// # 参数
/// - `rust_log`: 日志过滤规则（如 `info`、`quiz_chain_solver=debug`）
/// - `log_file`: 可选的日志文件路径，写入时不带颜色
///
/// # 返回
/// 返回文件写入器的 guard，需要在进程生命周期内持有
pub fn init(rust_log: &str, log_file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目链自动求解");
    info!("📧 身份: {}", config.student_email);
    info!(
        "🤖 模型: 抽取 {} / 求解 {}",
        config.llm_extract_model, config.llm_solve_model
    );
    info!(
        "⏱️ 链截止时间: {} 秒, 最大深度: {}, 最大并发链: {}",
        config.chain_deadline_secs, config.max_chain_depth, config.max_concurrent_chains
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
