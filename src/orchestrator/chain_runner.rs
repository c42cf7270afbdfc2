//! 单条链处理器 - 编排层
//!
//! 循环执行 [`HopFlow`]，根据提交结果决定结束、失败还是进入下一跳
//!
//! - 每跳开始前剩余时间不足 `min_hop` 直接失败
//! - 答案被拒绝默认终止链（可配置为有下一题时跳过）
//! - 跳数达到 `max_chain_depth` 时正常结束
//! - 截止时间过后永远不会报告完成

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::ChainPolicy;
use crate::error::HopError;
use crate::models::{ChainOutcome, ChainStatus, FailureReason, HopRecord, QuizTask};
use crate::workflow::{HopCtx, HopFlow, HopReport, HopState};

pub struct ChainRunner {
    flow: HopFlow,
}

impl ChainRunner {
    pub fn new(flow: HopFlow) -> Self {
        Self { flow }
    }

    fn policy(&self) -> &ChainPolicy {
        self.flow.policy()
    }

    /// 运行整条链直到终态
    pub async fn run(&self, task: QuizTask) -> ChainOutcome {
        let chain_id = task.chain_id();
        let origin_url = task.origin_url().to_string();
        let mut hops: Vec<HopRecord> = Vec::new();

        let status = self.drive(task, &mut hops).await;
        let outcome = ChainOutcome {
            chain_id,
            origin_url,
            status,
            hops,
        };

        match &outcome.status {
            ChainStatus::Done { .. } => info!("✅ {}", outcome),
            ChainStatus::Failed(_) => error!("❌ {}", outcome),
        }
        outcome
    }

    async fn drive(&self, mut task: QuizTask, hops: &mut Vec<HopRecord>) -> ChainStatus {
        let max_depth = self.policy().max_chain_depth;
        if task.chain_depth() >= max_depth {
            return failed(
                HopError::ChainDepthExceeded {
                    depth: task.chain_depth(),
                    max: max_depth,
                },
                task.chain_depth(),
            );
        }

        loop {
            let ctx = HopCtx::from_task(&task);
            let remaining = task.remaining();
            if remaining < self.policy().min_hop {
                warn!("{} ⏰ 剩余 {:?}，不足以开始新的一跳", ctx, remaining);
                return failed(
                    HopError::DeadlineExceeded {
                        state: HopState::Rendering,
                    },
                    task.chain_depth(),
                );
            }

            let report = match self.flow.run(&task).await {
                Ok(report) => report,
                Err(e) => {
                    error!("{} ❌ {}", ctx, e);
                    return failed(e, task.chain_depth());
                }
            };
            hops.push(record(&task, &report));

            let submission = report.submission;
            if task.is_expired() {
                return failed(
                    HopError::DeadlineExceeded {
                        state: HopState::Chaining,
                    },
                    task.chain_depth(),
                );
            }

            if !submission.accepted {
                let reason = submission
                    .reason
                    .clone()
                    .unwrap_or_else(|| "答案错误".to_string());
                let can_skip = self.policy().skip_on_rejection && submission.next_url.is_some();
                if !can_skip {
                    return failed(HopError::DefinitiveRejection { reason }, task.chain_depth());
                }
                warn!("{} ⚠️ 答案被拒绝 ({})，按配置跳到下一题", ctx, reason);
            }

            let Some(next_url) = submission.next_url else {
                return ChainStatus::Done {
                    depth_limit_reached: false,
                };
            };

            if task.chain_depth() + 1 >= max_depth {
                warn!("{} 已达到最大跳数 {}，不再跟随 {}", ctx, max_depth, next_url);
                return ChainStatus::Done {
                    depth_limit_reached: true,
                };
            }

            self.pause(&task).await;
            info!("{} ➡️ 进入下一题: {}", ctx, next_url);
            task = task.next_hop(next_url);
        }
    }

    /// 两跳之间的停顿，不超过剩余时间
    async fn pause(&self, task: &QuizTask) {
        let pause: Duration = self.policy().hop_pause.min(task.remaining());
        if !pause.is_zero() {
            sleep(pause).await;
        }
    }
}

fn record(task: &QuizTask, report: &HopReport) -> HopRecord {
    HopRecord {
        depth: task.chain_depth(),
        url: task.origin_url().to_string(),
        answer: Some(report.answer.value().clone()),
        accepted: Some(report.submission.accepted),
        degraded_files: report.degraded_files,
    }
}

fn failed(error: HopError, hop: u32) -> ChainStatus {
    ChainStatus::Failed(FailureReason {
        kind: error.kind(),
        message: error.to_string(),
        hop,
    })
}
