//! 页面启发式扫描 - 业务能力层
//!
//! 不依赖 LLM，直接从 HTML 里找提交地址、数据文件链接和可见文字。
//! 结果既作为 LLM 的补充上下文，也在 LLM 结果缺字段时兜底

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::models::{AnswerKind, RenderedPage};
use crate::utils::text::clip_chars;

/// 认为是数据文件的扩展名
const DATA_EXTENSIONS: &[&str] = &[
    "csv", "tsv", "xlsx", "xls", "xlsm", "ods", "pdf", "json", "ndjson", "jsonl", "txt", "xml",
    "png", "jpg", "jpeg", "gif", "webp", "mp3", "wav", "opus", "zip",
];

const MAX_LINKS: usize = 50;
const MAX_QUESTION_CHARS: usize = 4000;

/// 扫描结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicScan {
    /// 页面可见文字（截断）
    pub question: Option<String>,
    /// 可能的提交地址，按可信度排序
    pub submit_candidates: Vec<String>,
    /// 数据文件链接
    pub file_links: Vec<String>,
    /// 页面上的其他链接，供 LLM 参考
    pub links: Vec<String>,
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>()\[\]{}`]+"#).expect("valid url regex"))
}

fn relative_submit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bpost\b[^\n]{0,80}?\s(/[\w./-]*submit[\w./-]*)"#).expect("valid submit regex")
    })
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

/// 扫描渲染后的页面
pub fn scan(page: &RenderedPage) -> HeuristicScan {
    let base = Url::parse(&page.final_url).ok();
    let document = Html::parse_document(&page.html);
    let mut scan = HeuristicScan::default();

    for form in document.select(&selector("form[action]")) {
        if let Some(url) = form.value().attr("action").and_then(|a| resolve(base.as_ref(), a)) {
            push_unique(&mut scan.submit_candidates, url);
        }
    }

    let link_selector = selector(
        "a[href], iframe[src], embed[src], img[src], audio[src], video[src], source[src], object[data]",
    );
    for element in document.select(&link_selector) {
        let value = element.value();
        let raw = value
            .attr("href")
            .or_else(|| value.attr("src"))
            .or_else(|| value.attr("data"));
        let Some(url) = raw.and_then(|r| resolve(base.as_ref(), r)) else {
            continue;
        };
        if is_data_link(&url) || value.attr("download").is_some() {
            push_unique(&mut scan.file_links, url);
        } else if looks_like_submit(&url) {
            push_unique(&mut scan.submit_candidates, url);
        } else if scan.links.len() < MAX_LINKS {
            push_unique(&mut scan.links, url);
        }
    }

    let text = if page.text.trim().is_empty() {
        visible_text(&page.html)
    } else {
        page.text.clone()
    };

    // 正文里直接写出的地址
    for m in url_regex().find_iter(&text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string();
        if looks_like_submit(&url) {
            push_unique(&mut scan.submit_candidates, url);
        } else if is_data_link(&url) {
            push_unique(&mut scan.file_links, url);
        }
    }
    for caps in relative_submit_regex().captures_iter(&text) {
        if let Some(url) = resolve(base.as_ref(), &caps[1]) {
            push_unique(&mut scan.submit_candidates, url);
        }
    }

    let question = text.trim();
    if !question.is_empty() {
        scan.question = Some(clip_chars(question, MAX_QUESTION_CHARS).to_string());
    }
    scan
}

/// 相对地址按页面地址解析，只保留 http(s)
pub fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("data:") {
        return None;
    }
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn is_data_link(url: &str) -> bool {
    crate::services::file_analyzer::extension(url)
        .is_some_and(|ext| DATA_EXTENSIONS.contains(&ext.as_str()))
}

fn looks_like_submit(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.path().to_ascii_lowercase().contains("submit"))
}

fn push_unique(list: &mut Vec<String>, url: String) {
    if !list.contains(&url) {
        list.push(url);
    }
}

/// 根据题目措辞猜测答案形态
pub fn guess_answer_kind(question: &str) -> AnswerKind {
    let q = question.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| q.contains(n));

    if has(&["base64", "data uri", "data:image", "as an image", "chart", "plot", "visuali"]) {
        AnswerKind::EncodedBinary
    } else if has(&["true or false", "true/false", "yes or no", "boolean"]) {
        AnswerKind::Boolean
    } else if has(&["json object", "json array", "as json", "list of", "array of"]) {
        AnswerKind::StructuredObject
    } else if has(&[
        "how many", "sum of", "total", "average", "mean", "median", "count", "number of",
        "what is the value", "calculate",
    ]) {
        AnswerKind::Number
    } else {
        AnswerKind::String
    }
}

/// HTML 的可见文字，跳过 script / style
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();
    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template" | "head"))
        });
        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }
    parts.join("\n")
}
