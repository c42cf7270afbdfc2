//! 应用装配 - 编排层
//!
//! 唯一持有浏览器的地方：获取浏览器、创建模型与 HTTP 客户端，装配出调度器

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::info;

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{ChromiumRenderer, OpenAiModel, ReqwestHttpClient};
use crate::models::{ChainOutcome, Identity};
use crate::orchestrator::{ChainRunner, Dispatcher};
use crate::server::{self, AppState};
use crate::services::FailureLog;
use crate::workflow::{Capabilities, HopFlow};

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let browser = browser::open_browser(&config).await?;
        let renderer = ChromiumRenderer::new(
            browser,
            config.max_concurrent_pages,
            Duration::from_millis(config.render_settle_ms),
        );

        // 两个模型共享同一组并发名额
        let model_permits = Arc::new(Semaphore::new(config.max_concurrent_model_calls.max(1)));
        let model_timeout = Duration::from_secs(config.model_timeout_secs);
        let extract_model = OpenAiModel::new(
            &config.llm_api_key,
            &config.llm_api_base_url,
            config.llm_extract_model.clone(),
            Arc::clone(&model_permits),
            model_timeout,
        );
        let solve_model = OpenAiModel::new(
            &config.llm_api_key,
            &config.llm_api_base_url,
            config.llm_solve_model.clone(),
            model_permits,
            model_timeout,
        );

        let capabilities = Capabilities {
            renderer: Arc::new(renderer),
            extract_model: Arc::new(extract_model),
            solve_model: Arc::new(solve_model),
            http: Arc::new(ReqwestHttpClient::new()?),
        };

        let dispatcher = build_dispatcher(&config, &capabilities);
        info!("✓ 应用初始化完成");

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// 启动 HTTP 服务，直到进程退出
    pub async fn serve(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("🌐 服务已启动: http://{}", listener.local_addr()?);

        let state = AppState::new(Arc::clone(&self.dispatcher), Arc::clone(&self.config));
        server::serve(listener, state).await
    }

    /// 前台求解一条链
    pub async fn solve(&self, url: &str) -> ChainOutcome {
        self.dispatcher.solve(url).await
    }
}

/// 由配置和外部能力装配调度器
pub fn build_dispatcher(config: &Config, capabilities: &Capabilities) -> Dispatcher {
    let policy = config.chain_policy();
    let chain_deadline = policy.chain_deadline;
    let runner = ChainRunner::new(HopFlow::new(capabilities, policy));
    Dispatcher::new(
        runner,
        Identity::new(config.student_email.clone(), config.student_secret.clone()),
        chain_deadline,
        config.max_concurrent_chains,
        FailureLog::with_path(config.failure_log_file.clone()),
    )
}
