//! 链的终止状态

use std::fmt;

use serde_json::Value as JsonValue;

/// 失败种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Render,
    Extraction,
    Synthesis,
    Submission,
    DefinitiveRejection,
    DeadlineExceeded,
    ChainDepthExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Render => "render_error",
            FailureKind::Extraction => "extraction_error",
            FailureKind::Synthesis => "synthesis_error",
            FailureKind::Submission => "submission_error",
            FailureKind::DefinitiveRejection => "definitive_rejection",
            FailureKind::DeadlineExceeded => "deadline_exceeded",
            FailureKind::ChainDepthExceeded => "chain_depth_exceeded",
        };
        f.write_str(name)
    }
}

/// 失败原因：种类、说明、出错的跳数
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
    pub hop: u32,
}

/// 链的终态
#[derive(Debug, Clone, PartialEq)]
pub enum ChainStatus {
    /// 最后一跳被接受且没有后续，或已达到最大深度
    Done { depth_limit_reached: bool },
    Failed(FailureReason),
}

/// 一跳的执行记录
#[derive(Debug, Clone, PartialEq)]
pub struct HopRecord {
    pub depth: u32,
    pub url: String,
    pub answer: Option<JsonValue>,
    pub accepted: Option<bool>,
    pub degraded_files: usize,
}

/// 整条链的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub chain_id: u64,
    pub origin_url: String,
    pub status: ChainStatus,
    pub hops: Vec<HopRecord>,
}

impl ChainOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.status, ChainStatus::Done { .. })
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            ChainStatus::Failed(reason) => Some(reason),
            ChainStatus::Done { .. } => None,
        }
    }
}

impl fmt::Display for ChainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ChainStatus::Done {
                depth_limit_reached,
            } => write!(
                f,
                "链 {} 完成: {} 跳{}",
                self.chain_id,
                self.hops.len(),
                if *depth_limit_reached {
                    " (已达最大深度)"
                } else {
                    ""
                }
            ),
            ChainStatus::Failed(reason) => write!(
                f,
                "链 {} 失败于第 {} 跳: {} ({})",
                self.chain_id, reason.hop, reason.kind, reason.message
            ),
        }
    }
}
