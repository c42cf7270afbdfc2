use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
    pub url: String,
    pub chain_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub email_configured: bool,
    pub secret_configured: bool,
    pub model_configured: bool,
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// 接受一个起始 URL，校验身份后立即返回，链在后台运行
pub async fn accept_quiz(
    State(state): State<AppState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        warn!("⚠️ 收到无法解析的请求");
        return detail(StatusCode::BAD_REQUEST, "Invalid request");
    };

    // 先校验身份，身份不对时不透露 URL 是否合法
    let identity = state.dispatcher.identity();
    if request.email != identity.email {
        warn!("⚠️ 邮箱不匹配: {}", request.email);
        return detail(StatusCode::FORBIDDEN, "Invalid email");
    }
    if request.secret != identity.secret {
        warn!("⚠️ 密钥不匹配 (邮箱: {})", request.email);
        return detail(StatusCode::FORBIDDEN, "Invalid secret");
    }

    let is_http = url::Url::parse(&request.url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !is_http {
        warn!("⚠️ 请求中的 URL 无效: {}", request.url);
        return detail(StatusCode::BAD_REQUEST, "Invalid request");
    }

    let chain_id = state.dispatcher.dispatch(&request.url);
    info!("✓ 已启动链 #{}: {}", chain_id, request.url);

    Json(AcceptedResponse {
        status: "accepted".to_string(),
        message: "Quiz solving initiated".to_string(),
        url: request.url,
        chain_id,
    })
    .into_response()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = &state.config;
    Json(HealthResponse {
        status: "healthy".to_string(),
        email_configured: !config.student_email.trim().is_empty(),
        secret_configured: !config.student_secret.trim().is_empty(),
        model_configured: !config.llm_api_key.trim().is_empty(),
    })
}
