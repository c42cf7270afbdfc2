//! 页面渲染 - 基础设施层
//!
//! 持有 Browser 资源，只暴露"渲染一个 URL"的能力
//!
//! - 每次渲染新建一个标签页，结束后关闭，互不共享状态
//! - 并发标签页数由 Semaphore 限制

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::models::RenderedPage;

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 打开 URL，等待脚本执行后返回 HTML、可见文字和最终地址
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError>;
}

/// 基于 chromiumoxide 的渲染器
pub struct ChromiumRenderer {
    browser: Browser,
    pages: Semaphore,
    settle: Duration,
}

impl ChromiumRenderer {
    pub fn new(browser: Browser, max_pages: usize, settle: Duration) -> Self {
        Self {
            browser,
            pages: Semaphore::new(max_pages.max(1)),
            settle,
        }
    }

    async fn read_page(&self, page: &Page, url: &str) -> Result<RenderedPage, RenderError> {
        let navigation = |e: chromiumoxide::error::CdpError| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        page.goto(url).await.map_err(navigation)?;
        page.wait_for_navigation().await.map_err(navigation)?;

        // 等待页面脚本把题目写进 DOM
        sleep(self.settle).await;

        let html = page.content().await.map_err(navigation)?;
        let text: String = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(navigation)?
            .into_value()
            .unwrap_or_default();
        let final_url = page
            .url()
            .await
            .map_err(navigation)?
            .unwrap_or_else(|| url.to_string());

        debug!("页面渲染完成: {} (HTML {} 字节, 文本 {} 字符)", final_url, html.len(), text.chars().count());

        Ok(RenderedPage {
            html,
            text,
            final_url,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let _permit = self
            .pages
            .acquire()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(format!("创建页面失败: {}", e)))?;

        let result = match tokio::time::timeout(timeout, self.read_page(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        };

        if let Err(e) = page.close().await {
            warn!("关闭页面失败: {}", e);
        }
        result
    }
}
