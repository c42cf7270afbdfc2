use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::AppState;

/// 组装路由
///
/// * `POST /` 接受新的题目链
/// * `GET /health` 健康检查
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::accept_quiz))
        .route("/health", get(handlers::health))
        .with_state(state)
}
