//! 答案提交服务 - 业务能力层
//!
//! 只负责"提交一个答案并解释响应"，不关心链路

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::error::SubmissionError;
use crate::infrastructure::{HttpClient, HttpReply};
use crate::models::{Answer, Identity, SubmissionEndpoint, SubmissionReply, SubmissionResult};
use crate::utils::{retry_async, truncate_text, RetryPolicy};

pub struct SubmissionClient {
    http: Arc<dyn HttpClient>,
    retry: RetryPolicy,
}

impl SubmissionClient {
    pub fn new(http: Arc<dyn HttpClient>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    /// 提交答案
    ///
    /// 只有连接失败/超时会重试；任何 HTTP 响应都视为最终结果
    pub async fn submit(
        &self,
        endpoint: &SubmissionEndpoint,
        answer: &Answer,
        identity: &Identity,
        quiz_url: &str,
        timeout: Duration,
    ) -> Result<SubmissionResult, SubmissionError> {
        let payload = build_payload(endpoint, answer, identity, quiz_url);
        info!("📤 正在提交答案到 {}: {}", endpoint.url, truncate_text(&answer.value().to_string(), 80));

        let http = self.http.as_ref();
        let payload = &payload;
        let url = endpoint.url.as_str();
        let reply = retry_async(self.retry, "提交答案", SubmissionError::is_transient, move || async move {
            http.post_json(url, payload, timeout)
                .await
                .map_err(SubmissionError::Transport)
        })
        .await?;

        let result = interpret(reply)?;
        if result.accepted {
            info!("✓ 答案正确{}", result.next_url.as_deref().map(|u| format!("，下一题: {}", u)).unwrap_or_default());
        } else {
            warn!("⚠️ 答案被拒绝: {}", result.reason.as_deref().unwrap_or("(无原因)"));
        }
        Ok(result)
    }
}

/// 提交负载：额外字段在前，身份、题目地址和答案字段覆盖同名项
pub fn build_payload(
    endpoint: &SubmissionEndpoint,
    answer: &Answer,
    identity: &Identity,
    quiz_url: &str,
) -> JsonValue {
    let mut payload = endpoint.extra_fields.clone();
    payload.insert("email".to_string(), json!(identity.email));
    payload.insert("secret".to_string(), json!(identity.secret));
    payload.insert("url".to_string(), json!(quiz_url));
    payload.insert(endpoint.answer_field.clone(), answer.value().clone());
    JsonValue::Object(payload)
}

/// 解释提交响应
///
/// - 能解析出 `correct` 字段就是最终判定（即使状态码非 2xx）
/// - 2xx 但无法解析：`Ambiguous`
/// - 非 2xx 且无法解析：`Status`
pub fn interpret(reply: HttpReply) -> Result<SubmissionResult, SubmissionError> {
    let parsed = serde_json::from_str::<JsonValue>(&reply.body)
        .ok()
        .and_then(|raw| {
            serde_json::from_value::<SubmissionReply>(raw.clone())
                .ok()
                .map(|r| (r, raw))
        });

    match parsed {
        Some((verdict, raw)) => Ok(SubmissionResult::from_reply(verdict, raw)),
        None if reply.is_success() => Err(SubmissionError::Ambiguous {
            body: truncate_text(&reply.body, 500),
        }),
        None => Err(SubmissionError::Status {
            status: reply.status,
            body: truncate_text(&reply.body, 500),
        }),
    }
}
