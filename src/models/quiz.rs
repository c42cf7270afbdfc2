//! 题目链的核心数据：任务、渲染页面、题目描述

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::time::Instant;

/// 提交身份（邮箱 + 密钥）
///
/// 进程启动时注入，之后只读
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub secret: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("secret", &"***")
            .finish()
    }
}

/// 一次被接受的解题请求
///
/// 身份和截止时间在整条链上共享且不可修改，每跳一次 `chain_depth` 加一
#[derive(Debug, Clone)]
pub struct QuizTask {
    chain_id: u64,
    identity: Arc<Identity>,
    origin_url: String,
    deadline: Instant,
    chain_depth: u32,
}

impl QuizTask {
    /// 创建链上的第一个任务
    pub fn new(
        chain_id: u64,
        identity: Arc<Identity>,
        origin_url: impl Into<String>,
        deadline: Instant,
    ) -> Self {
        Self {
            chain_id,
            identity,
            origin_url: origin_url.into(),
            deadline,
            chain_depth: 0,
        }
    }

    /// 为下一跳构建任务：同一身份、同一截止时间、深度加一
    pub fn next_hop(&self, next_url: impl Into<String>) -> Self {
        Self {
            chain_id: self.chain_id,
            identity: Arc::clone(&self.identity),
            origin_url: next_url.into(),
            deadline: self.deadline,
            chain_depth: self.chain_depth + 1,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn origin_url(&self) -> &str {
        &self.origin_url
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn chain_depth(&self) -> u32 {
        self.chain_depth
    }

    /// 剩余时间，已过期时为零
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// 渲染后的页面，只在一次抽取步骤内存在
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// 完整 HTML
    pub html: String,
    /// 可见文本
    pub text: String,
    /// 重定向之后的最终 URL
    pub final_url: String,
}

/// 期望的答案形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerKind {
    Number,
    String,
    Boolean,
    StructuredObject,
    EncodedBinary,
}

impl AnswerKind {
    /// 宽松解析 LLM 给出的类型标签
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let kind = match normalized.as_str() {
            "number" | "numeric" | "integer" | "int" | "float" | "decimal" => AnswerKind::Number,
            "string" | "text" | "str" => AnswerKind::String,
            "boolean" | "bool" => AnswerKind::Boolean,
            "structured-object" | "object" | "json" | "array" | "list" | "dict" | "structured" => {
                AnswerKind::StructuredObject
            }
            "encoded-binary" | "base64" | "data-uri" | "base64-data-uri" | "image" | "file"
            | "binary" => AnswerKind::EncodedBinary,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerKind::Number => "number",
            AnswerKind::String => "string",
            AnswerKind::Boolean => "boolean",
            AnswerKind::StructuredObject => "structured-object",
            AnswerKind::EncodedBinary => "encoded-binary",
        }
    }
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提交地址以及提交字段约定
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionEndpoint {
    pub url: String,
    /// 答案所在的字段名，默认 `answer`
    pub answer_field: String,
    /// 页面要求额外携带的字段
    pub extra_fields: Map<String, JsonValue>,
}

impl SubmissionEndpoint {
    pub const DEFAULT_ANSWER_FIELD: &'static str = "answer";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            answer_field: Self::DEFAULT_ANSWER_FIELD.to_string(),
            extra_fields: Map::new(),
        }
    }
}

/// 从一个页面抽取出的结构化题目
///
/// 每跳重新生成，创建后不再修改
#[derive(Debug, Clone)]
pub struct QuizDescriptor {
    pub question_text: String,
    pub submission_endpoint: SubmissionEndpoint,
    /// 按页面中出现顺序排列的文件 URL
    pub file_references: Vec<String>,
    pub expected_answer_kind: AnswerKind,
    /// 页面给出的补充说明
    pub raw_context: String,
    /// 题目页面的最终 URL，提交时回传
    pub page_url: String,
}
