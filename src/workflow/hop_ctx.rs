//! 一跳的处理上下文
//!
//! 封装"我正在处理哪条链的第几跳"这一信息，以及这条链的截止时间

use std::fmt::Display;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::QuizTask;

#[derive(Debug, Clone)]
pub struct HopCtx {
    pub chain_id: u64,

    /// 链深度（从 0 开始）
    pub depth: u32,

    /// 本跳的题目地址
    pub url: String,

    deadline: Instant,
}

impl HopCtx {
    pub fn from_task(task: &QuizTask) -> Self {
        Self {
            chain_id: task.chain_id(),
            depth: task.chain_depth(),
            url: task.origin_url().to_string(),
            deadline: task.deadline(),
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// 单个操作的超时不能超过剩余时间
    pub fn clamp(&self, timeout: Duration) -> Duration {
        timeout.min(self.remaining())
    }
}

impl Display for HopCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[链 #{} 跳 #{}]", self.chain_id, self.depth)
    }
}
