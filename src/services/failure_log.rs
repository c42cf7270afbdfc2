//! 失败记录服务 - 业务能力层
//!
//! 只负责"把失败的链追加写入文件"，不关心流程

use anyhow::Result;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::ChainOutcome;

/// 失败链记录
///
/// 每行一条：时间 | 链 ID | 起始 URL | 失败跳数 | 种类 | 说明
pub struct FailureLog {
    path: String,
}

impl FailureLog {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 追加一条失败记录；成功的链不写
    pub async fn record(&self, outcome: &ChainOutcome) -> Result<()> {
        let Some(reason) = outcome.failure() else {
            return Ok(());
        };
        debug!("写入失败记录: 链 {} -> {}", outcome.chain_id, self.path);

        let line = format!(
            "{} | 链 {} | {} | 第 {} 跳 | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            outcome.chain_id,
            outcome.origin_url,
            reason.hop,
            reason.kind,
            reason.message.replace('\n', " ")
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
