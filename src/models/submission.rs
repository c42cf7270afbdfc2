//! 提交结果

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// 提交接口返回的 JSON
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionReply {
    pub correct: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// 提交结果，决定链是否继续
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub accepted: bool,
    pub next_url: Option<String>,
    pub reason: Option<String>,
    pub raw_response: JsonValue,
}

impl SubmissionResult {
    pub fn from_reply(reply: SubmissionReply, raw_response: JsonValue) -> Self {
        let next_url = reply
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self {
            accepted: reply.correct,
            next_url,
            reason: reply.reason.filter(|r| !r.trim().is_empty()),
            raw_response,
        }
    }
}
