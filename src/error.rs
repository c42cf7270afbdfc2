//! 错误类型
//!
//! 每个关注点一个错误枚举，工作流层再把它们汇总成 [`HopError`]。
//! 单个文件的 [`FetchError`] 只会被吸收进降级的 `FileArtifact`，不会中断一跳。

use std::time::Duration;

use thiserror::Error;

use crate::models::AnswerKind;
use crate::models::outcome::FailureKind;
use crate::workflow::HopState;

/// 页面渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    Navigation { url: String, message: String },
    /// 导航或脚本执行超时
    #[error("渲染 {url} 超时 ({timeout:?})")]
    Timeout { url: String, timeout: Duration },
    /// 浏览器本身出错（启动、创建页面）
    #[error("浏览器错误: {0}")]
    Browser(String),
}

/// 语言模型调用错误
#[derive(Debug, Error)]
pub enum ModelError {
    /// API 调用失败（配额、网络、服务端错误）
    #[error("LLM API 调用失败 (模型: {model}): {message}")]
    Api { model: String, message: String },
    /// 调用超时
    #[error("LLM 调用超时 (模型: {model}, {timeout:?})")]
    Timeout { model: String, timeout: Duration },
    /// 返回内容为空
    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 请求构建失败
    #[error("LLM 请求构建失败: {0}")]
    Request(String),
}

impl ModelError {
    /// 是否值得在本地重试
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::Api { .. } | ModelError::Timeout { .. } | ModelError::EmptyResponse { .. }
        )
    }
}

/// HTTP 下载错误（单个文件级别，不致命）
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("请求 {url} 返回非成功状态码 {status}")]
    Status { url: String, status: u16 },
    #[error("请求 {url} 超时")]
    Timeout { url: String },
    #[error("请求 {url} 失败: {message}")]
    Transport {
        url: String,
        message: String,
        connect: bool,
    },
    #[error("无效的 URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// 超时和连接失败属于瞬时错误
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Transport { connect, .. } => *connect,
            _ => false,
        }
    }
}

/// 题目抽取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("页面中没有可识别的题目")]
    NoQuestion,
    #[error("页面中没有可用的提交地址")]
    NoSubmissionTarget,
    #[error("LLM 抽取结果无法解析: {0}")]
    Malformed(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// 答案生成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("答案类型不匹配: 期望 {expected}, 实际得到 {got}")]
    ShapeMismatch { expected: AnswerKind, got: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// 答案提交错误
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("提交请求失败: {0}")]
    Transport(FetchError),
    #[error("提交返回非成功状态码 {status}: {body}")]
    Status { status: u16, body: String },
    /// 网络成功但响应无法判断对错，按确定性失败处理
    #[error("提交响应无法解析: {body}")]
    Ambiguous { body: String },
}

impl SubmissionError {
    /// 只有传输层的超时/连接失败才重试
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmissionError::Transport(e) if e.is_transient())
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {name} 不存在")]
    MissingVar { name: String },
    #[error("环境变量 {name} 解析失败: 值 '{value}' 无法转换为 {expected}")]
    InvalidVar {
        name: String,
        value: String,
        expected: &'static str,
    },
    #[error("配置文件 {path} 读取失败: {message}")]
    File { path: String, message: String },
}

/// 一跳中的致命错误，会让整条链进入 `Failed`
#[derive(Debug, Error)]
pub enum HopError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("答案被明确拒绝: {reason}")]
    DefinitiveRejection { reason: String },
    #[error("截止时间已过 (状态: {state})")]
    DeadlineExceeded { state: HopState },
    #[error("链深度 {depth} 超过上限 {max}")]
    ChainDepthExceeded { depth: u32, max: u32 },
}

impl HopError {
    /// 错误种类，用于链的终止原因
    pub fn kind(&self) -> FailureKind {
        match self {
            HopError::Render(_) => FailureKind::Render,
            HopError::Extraction(_) => FailureKind::Extraction,
            HopError::Synthesis(_) => FailureKind::Synthesis,
            HopError::Submission(_) => FailureKind::Submission,
            HopError::DefinitiveRejection { .. } => FailureKind::DefinitiveRejection,
            HopError::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
            HopError::ChainDepthExceeded { .. } => FailureKind::ChainDepthExceeded,
        }
    }
}
