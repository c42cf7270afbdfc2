//! 下载文件及其摘要

use std::fmt;
use std::sync::Arc;

/// 文件的媒体类别，决定用哪种方式分析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// CSV / TSV
    Tabular,
    /// xlsx / xls / ods
    Spreadsheet,
    /// PDF、纯文本、HTML
    Document,
    /// JSON 一类
    StructuredText,
    /// 其他
    Binary,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Tabular => "tabular",
            MediaKind::Spreadsheet => "spreadsheet",
            MediaKind::Document => "document",
            MediaKind::StructuredText => "structured-text",
            MediaKind::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// 供 LLM 阅读的有界摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSummary {
    /// 一行标题，例如 "CSV 表格: 120 行 × 3 列"
    pub title: String,
    /// 摘要正文，长度受预算限制
    pub body: String,
    /// 解析失败时的原因
    pub error: Option<String>,
}

impl FileSummary {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            error: None,
        }
    }

    /// 降级摘要：正文为空，附带错误说明
    pub fn degraded(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// 一个已下载的文件
///
/// `raw_bytes` 下载后只读；`summary` 由文件分析器填充
#[derive(Debug, Clone)]
pub struct FileArtifact {
    pub source_url: String,
    pub media_kind: MediaKind,
    pub content_type: Option<String>,
    raw_bytes: Arc<[u8]>,
    pub summary: FileSummary,
}

impl FileArtifact {
    pub fn new(
        source_url: impl Into<String>,
        media_kind: MediaKind,
        content_type: Option<String>,
        raw_bytes: Arc<[u8]>,
        summary: FileSummary,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            media_kind,
            content_type,
            raw_bytes,
            summary,
        }
    }

    /// 下载失败时的降级产物
    pub fn degraded(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        let source_url = source_url.into();
        let summary = FileSummary::degraded(file_name(&source_url), reason);
        Self {
            source_url,
            media_kind: MediaKind::Binary,
            content_type: None,
            raw_bytes: Arc::from(Vec::new()),
            summary,
        }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.source_url)
    }

    pub fn is_degraded(&self) -> bool {
        self.summary.is_degraded()
    }
}

/// URL 最后一段（去掉查询串）
pub fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}
