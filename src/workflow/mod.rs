//! 流程层：定义"一跳"的完整处理流程

pub mod hop_ctx;
pub mod hop_flow;

use std::fmt;

pub use hop_ctx::HopCtx;
pub use hop_flow::{Capabilities, HopFlow, HopReport};

/// 一跳内部的状态
///
/// Rendering → Extracting → FetchingFiles → Analyzing → Synthesizing → Submitting → Chaining，
/// 每次进入新状态前都会检查截止时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopState {
    Rendering,
    Extracting,
    FetchingFiles,
    Analyzing,
    Synthesizing,
    Submitting,
    /// 提交完成，决定结束还是进入下一跳
    Chaining,
}

impl fmt::Display for HopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HopState::Rendering => "rendering",
            HopState::Extracting => "extracting",
            HopState::FetchingFiles => "fetching-files",
            HopState::Analyzing => "analyzing",
            HopState::Synthesizing => "synthesizing",
            HopState::Submitting => "submitting",
            HopState::Chaining => "chaining",
        };
        f.write_str(name)
    }
}
