use anyhow::Result;
use clap::{Parser, Subcommand};

use quiz_chain_solver::utils::logging;
use quiz_chain_solver::{App, Config};

#[derive(Parser)]
#[command(name = "quiz-chain-solver", version, about = "自动求解题目链")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 启动 HTTP 接入服务（默认）
    Serve,
    /// 前台求解一条链并输出结果
    Solve {
        /// 起始题目 URL
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置（内部会读取 .env）
    let config = Config::load()?;

    // 初始化日志，guard 需要活到进程结束
    let _guard = logging::init(&config.rust_log, config.log_file.as_deref())?;
    logging::log_startup(&config);

    let app = App::initialize(config).await?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve().await?,
        Command::Solve { url } => {
            let outcome = app.solve(&url).await;
            println!("{}", outcome);
            for hop in &outcome.hops {
                println!(
                    "  跳 #{} {} -> 答案 {} ({})",
                    hop.depth,
                    hop.url,
                    hop.answer.as_ref().map(|a| a.to_string()).unwrap_or_default(),
                    match hop.accepted {
                        Some(true) => "正确",
                        Some(false) => "错误",
                        None => "未提交",
                    }
                );
            }
            if !outcome.is_done() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
