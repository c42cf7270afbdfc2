//! 链调度器 - 编排层
//!
//! 接受新的起始 URL，分配链 ID、固定截止时间，然后在后台运行
//!
//! - 截止时间从"被接受"那一刻起算，排队等待并发名额的时间也算在内
//! - 用 Semaphore 限制同时运行的链数量
//! - 链之间互不影响，一条链失败不会打断其他链

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::models::{ChainOutcome, Identity, QuizTask};
use crate::orchestrator::ChainRunner;
use crate::services::FailureLog;

pub struct Dispatcher {
    runner: Arc<ChainRunner>,
    identity: Arc<Identity>,
    chain_deadline: Duration,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
    failure_log: Arc<FailureLog>,
}

impl Dispatcher {
    pub fn new(
        runner: ChainRunner,
        identity: Identity,
        chain_deadline: Duration,
        max_concurrent_chains: usize,
        failure_log: FailureLog,
    ) -> Self {
        Self {
            runner: Arc::new(runner),
            identity: Arc::new(identity),
            chain_deadline,
            permits: Arc::new(Semaphore::new(max_concurrent_chains.max(1))),
            next_id: AtomicU64::new(1),
            failure_log: Arc::new(failure_log),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// 创建新链的第一个任务，截止时间在此刻固定
    fn accept(&self, origin_url: &str) -> QuizTask {
        let chain_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.chain_deadline;
        info!("📥 [链 #{}] 已接受: {} (时限 {:?})", chain_id, origin_url, self.chain_deadline);
        QuizTask::new(chain_id, Arc::clone(&self.identity), origin_url, deadline)
    }

    /// 在后台运行一条新链，立即返回链 ID
    pub fn dispatch(&self, origin_url: &str) -> u64 {
        let task = self.accept(origin_url);
        let chain_id = task.chain_id();

        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        let failure_log = Arc::clone(&self.failure_log);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("[链 #{}] 无法获取并发名额: {}", chain_id, e);
                    return;
                }
            };
            let outcome = runner.run(task).await;
            record_failure(&failure_log, &outcome).await;
        });

        chain_id
    }

    /// 在前台运行一条链并等待结果（命令行模式）
    pub async fn solve(&self, origin_url: &str) -> ChainOutcome {
        let task = self.accept(origin_url);
        let outcome = self.runner.run(task).await;
        record_failure(&self.failure_log, &outcome).await;
        outcome
    }
}

async fn record_failure(failure_log: &FailureLog, outcome: &ChainOutcome) {
    if let Err(e) = failure_log.record(outcome).await {
        warn!("⚠️ 写入失败记录 {} 出错: {}", failure_log.path(), e);
    }
}
