//! 接入层：axum HTTP 服务
//!
//! 只做校验和转发，解题由调度器在后台完成

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::orchestrator::Dispatcher;

pub use handlers::{AcceptedResponse, HealthResponse, SolveRequest};
pub use routes::create_router;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, config: Arc<Config>) -> Self {
        Self { dispatcher, config }
    }
}

/// 在给定监听器上运行服务
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
