//! 语言模型 - 基础设施层
//!
//! 把 "prompt → 文本" 封装成 [`LanguageModel`] trait，业务层不直接接触 API 客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（自定义 api_base）

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::utils::{retry_async, RetryPolicy};

/// 一次调用的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// 期望的响应形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// 要求模型只输出一个 JSON 对象
    Json,
    /// 自由文本
    Text,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 模型名（日志用）
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, ModelError>;
}

const JSON_ONLY: &str = "Respond with a single valid JSON object and nothing else.";

/// 带重试的调用
pub async fn complete_with_retry(
    model: &dyn LanguageModel,
    prompt: &Prompt,
    shape: ResponseShape,
    retry: RetryPolicy,
) -> Result<String, ModelError> {
    let label = format!("LLM 调用 ({})", model.name());
    retry_async(retry, &label, ModelError::is_transient, || model.complete(prompt, shape)).await
}

/// OpenAI 兼容接口的实现
///
/// 多个实例可以共享同一个 `Semaphore`，共同限制并发调用数
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model_name: String,
    permits: Arc<Semaphore>,
    timeout: Duration,
    max_tokens: u32,
}

impl OpenAiModel {
    pub fn new(
        api_key: &str,
        api_base: &str,
        model_name: impl Into<String>,
        permits: Arc<Semaphore>,
        timeout: Duration,
    ) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            permits,
            timeout,
            max_tokens: 4096,
        }
    }

    async fn send(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, ModelError> {
        let request_error = |e: async_openai::error::OpenAIError| ModelError::Request(e.to_string());

        let system = match shape {
            ResponseShape::Json => format!("{}\n\n{}", prompt.system, JSON_ONLY),
            ResponseShape::Text => prompt.system.clone(),
        };

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(request_error)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user.as_str())
                    .build()
                    .map_err(request_error)?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(request_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            ModelError::Api {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::EmptyResponse {
                model: self.model_name.clone(),
            })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, ModelError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        debug!(
            "调用 LLM API，模型: {}，用户消息长度: {} 字符",
            self.model_name,
            prompt.user.len()
        );

        match tokio::time::timeout(self.timeout, self.send(prompt, shape)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                model: self.model_name.clone(),
                timeout: self.timeout,
            }),
        }
    }
}
