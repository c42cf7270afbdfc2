//! 文件下载服务 - 业务能力层
//!
//! 下载一跳引用的所有文件；单个文件失败只记录，不中断

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::FetchError;
use crate::infrastructure::{HttpBody, HttpClient};
use crate::utils::{retry_async, RetryPolicy};

/// 一个文件的下载结果
#[derive(Debug)]
pub struct Download {
    pub url: String,
    pub outcome: Result<HttpBody, FetchError>,
}

pub struct FileFetcher {
    http: Arc<dyn HttpClient>,
    retry: RetryPolicy,
}

impl FileFetcher {
    pub fn new(http: Arc<dyn HttpClient>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    /// 按顺序逐个下载，结果与输入一一对应
    pub async fn fetch_all(&self, urls: &[String], timeout: Duration) -> Vec<Download> {
        let mut downloads = Vec::with_capacity(urls.len());
        for url in urls {
            downloads.push(self.fetch_one(url, timeout).await);
        }

        let failed = downloads.iter().filter(|d| d.outcome.is_err()).count();
        if !urls.is_empty() {
            info!("📥 文件下载完成: {}/{} 成功", urls.len() - failed, urls.len());
        }
        downloads
    }

    async fn fetch_one(&self, url: &str, timeout: Duration) -> Download {
        let label = format!("下载 {}", url);
        let outcome = retry_async(self.retry, &label, is_retryable, || self.http.get(url, timeout)).await;
        if let Err(e) = &outcome {
            warn!("⚠️ 文件下载失败，将以降级摘要继续: {}", e);
        }
        Download {
            url: url.to_string(),
            outcome,
        }
    }
}

/// GET 是幂等的，除了瞬时错误，5xx 也重试
fn is_retryable(e: &FetchError) -> bool {
    match e {
        FetchError::Status { status, .. } => *status >= 500,
        FetchError::Transport { .. } => true,
        other => other.is_transient(),
    }
}
