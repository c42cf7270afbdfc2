//! 文件分析服务 - 业务能力层
//!
//! 把下载到的字节转成有界的文本摘要，供答案合成使用
//!
//! - 按 [`MediaKind`] 分派到各自的解析器
//! - 解析失败不会向上抛错，而是返回带 `error` 的降级摘要
//! - 摘要长度受 [`AnalysisLimits::summary_char_budget`] 约束

mod document;
mod media_kind;
mod spreadsheet;
mod structured;
mod table;
mod tabular;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::infrastructure::HttpBody;
use crate::models::{FileArtifact, FileSummary, MediaKind};
use crate::services::file_fetcher::Download;
use crate::utils::text::clip_chars;

pub use media_kind::extension;
pub use table::{format_number, Cell, ColumnProfile, Table, TableSummary};

/// 摘要大小限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// 单个文件摘要的字符上限
    pub summary_char_budget: usize,
    /// 表格样例行数
    pub sample_rows: usize,
    /// 类别列的去重计数上限
    pub distinct_value_cap: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            summary_char_budget: 3000,
            sample_rows: 5,
            distinct_value_cap: 20,
        }
    }
}

/// 来自题目的提示信息，用于挑选文档中的相关页
#[derive(Debug, Clone, Default)]
pub struct AnalysisHints {
    pub keywords: Vec<String>,
}

const STOPWORDS: &[&str] = &[
    "what", "which", "this", "that", "with", "from", "file", "data", "your", "answer", "submit",
    "the", "please", "page", "value", "values", "into", "there", "their", "have", "will", "should",
];

impl AnalysisHints {
    /// 从题目文本里抽取关键词（长度 ≥ 4，去停用词，去重）
    pub fn from_question(question: &str) -> Self {
        let mut keywords: Vec<String> = Vec::new();
        for word in question
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= 4 && !STOPWORDS.contains(&w.as_str()))
        {
            if !keywords.contains(&word) {
                keywords.push(word);
            }
        }
        Self { keywords }
    }
}

/// 解析器的中间结果
pub(crate) struct Analysis {
    pub title: String,
    pub body: String,
}

/// 分析一个文件，永不失败
///
/// # 参数
/// - `bytes`: 原始字节
/// - `kind`: 已识别的媒体类型
/// - `content_type`: 服务器声明的类型（仅用于二进制文件描述）
/// - `hints`: 题目关键词
/// - `limits`: 摘要限制
pub fn analyze(
    bytes: &[u8],
    kind: MediaKind,
    content_type: Option<&str>,
    hints: &AnalysisHints,
    limits: &AnalysisLimits,
) -> FileSummary {
    let default_title = format!("{} file", kind);

    // 第三方解析器遇到畸形输入可能 panic
    let outcome = catch_unwind(AssertUnwindSafe(|| match kind {
        MediaKind::Tabular => tabular::analyze(bytes, limits),
        MediaKind::Spreadsheet => spreadsheet::analyze(bytes, limits),
        MediaKind::Document => document::analyze(bytes, content_type, hints, limits),
        MediaKind::StructuredText => structured::analyze(bytes, limits),
        MediaKind::Binary => Ok(describe_binary(bytes, content_type)),
    }));

    match outcome {
        Ok(Ok(analysis)) => {
            debug!("文件分析完成: {} ({} 字符)", analysis.title, analysis.body.len());
            FileSummary::new(analysis.title, bound(&analysis.body, limits.summary_char_budget))
        }
        Ok(Err(e)) => {
            warn!("⚠️ 文件解析失败 ({}): {:#}", kind, e);
            FileSummary::degraded(default_title, format!("{:#}", e))
        }
        Err(_) => {
            warn!("⚠️ 文件解析器崩溃 ({})", kind);
            FileSummary::degraded(default_title, "parser panicked on malformed input")
        }
    }
}

/// 把下载结果转成 [`FileArtifact`]，解析放在阻塞线程池里跑
///
/// 下载失败的文件直接成为降级产物；逐个处理，输出顺序与输入一致
pub async fn build_artifacts(
    downloads: Vec<Download>,
    hints: &AnalysisHints,
    limits: AnalysisLimits,
) -> Vec<FileArtifact> {
    let hints = Arc::new(hints.clone());
    let mut artifacts = Vec::with_capacity(downloads.len());
    for Download { url, outcome } in downloads {
        let artifact = match outcome {
            Err(e) => FileArtifact::degraded(url, e.to_string()),
            Ok(body) => {
                let hints = Arc::clone(&hints);
                let source_url = url.clone();
                tokio::task::spawn_blocking(move || build_artifact(source_url, body, &hints, &limits))
                    .await
                    .unwrap_or_else(|e| FileArtifact::degraded(url, format!("analysis task failed: {}", e)))
            }
        };
        artifacts.push(artifact);
    }
    artifacts
}

/// 识别类型并生成摘要
pub fn build_artifact(
    url: String,
    body: HttpBody,
    hints: &AnalysisHints,
    limits: &AnalysisLimits,
) -> FileArtifact {
    let kind = MediaKind::detect(body.content_type.as_deref(), &url, &body.bytes);
    let summary = analyze(&body.bytes, kind, body.content_type.as_deref(), hints, limits);
    FileArtifact::new(url, kind, body.content_type, Arc::from(body.bytes), summary)
}

fn describe_binary(bytes: &[u8], content_type: Option<&str>) -> Analysis {
    let declared = content_type.unwrap_or("unknown");
    Analysis {
        title: format!("Binary file ({})", declared),
        body: format!(
            "Binary content, type {}, {} bytes. Contents are not readable as text.",
            declared,
            bytes.len()
        ),
    }
}

/// 截断到预算，并标记截断
fn bound(body: &str, budget: usize) -> String {
    const MARKER: &str = "\n...[truncated]";
    if body.chars().count() <= budget {
        return body.to_string();
    }
    let keep = budget.saturating_sub(MARKER.chars().count());
    format!("{}{}", clip_chars(body, keep), MARKER)
}
