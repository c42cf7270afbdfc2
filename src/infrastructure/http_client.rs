//! HTTP 客户端 - 基础设施层
//!
//! 只暴露 GET 字节和 POST JSON 两种能力，不认识题目与答案

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// GET 的响应体
#[derive(Debug, Clone, Default)]
pub struct HttpBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// POST 的响应（任何状态码都会返回）
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// 下载，非 2xx 视为错误
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpBody, FetchError>;

    /// 提交 JSON，返回状态码和原始响应体
    async fn post_json(
        &self,
        url: &str,
        body: &JsonValue,
        timeout: Duration,
    ) -> Result<HttpReply, FetchError>;
}

/// 基于 reqwest 的实现
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("quiz-chain-solver/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn check_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!("{}: 不支持的协议 {}", url, other))),
    }
}

fn map_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = e.status() {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
            connect: e.is_connect(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpBody, FetchError> {
        let parsed = check_url(url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| map_error(url, e))?;
        debug!("GET {} 完成: {} 字节", url, bytes.len());

        Ok(HttpBody {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &JsonValue,
        timeout: Duration,
    ) -> Result<HttpReply, FetchError> {
        let parsed = check_url(url)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(parsed)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| map_error(url, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| map_error(url, e))?;
        debug!("POST {} 返回 {}: {} 字节", url, status, body.len());

        Ok(HttpReply { status, body })
    }
}
