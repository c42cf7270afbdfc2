//! 文档解析：PDF 按页抽取文本，纯文本 / HTML 取可见文字

use std::fmt::Write as _;

use anyhow::{Context, Result};

use super::{Analysis, AnalysisHints, AnalysisLimits};
use crate::services::page_heuristics::visible_text;

pub(crate) fn analyze(
    bytes: &[u8],
    content_type: Option<&str>,
    hints: &AnalysisHints,
    limits: &AnalysisLimits,
) -> Result<Analysis> {
    if bytes.starts_with(b"%PDF") {
        return analyze_pdf(bytes, hints, limits);
    }

    let text = String::from_utf8_lossy(bytes);
    let is_html = content_type.is_some_and(|c| c.contains("html"))
        || text.trim_start().get(..15).is_some_and(|head| {
            let head = head.to_ascii_lowercase();
            head.starts_with("<!doctype html") || head.starts_with("<html")
        });

    if is_html {
        let body = visible_text(&text);
        Ok(Analysis {
            title: format!("HTML document ({} chars)", body.chars().count()),
            body,
        })
    } else {
        Ok(Analysis {
            title: format!("Text document ({} lines)", text.lines().count()),
            body: text.into_owned(),
        })
    }
}

/// 第 1 页总在最前，其余页按关键词命中数排序
fn analyze_pdf(bytes: &[u8], hints: &AnalysisHints, limits: &AnalysisLimits) -> Result<Analysis> {
    let doc = lopdf::Document::load_mem(bytes).context("无法解析 PDF")?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        anyhow::bail!("PDF 没有页面");
    }

    let pages: Vec<(u32, String)> = page_numbers
        .iter()
        .map(|&n| (n, doc.extract_text(&[n]).unwrap_or_default()))
        .collect();

    let order = rank_pages(&pages, &hints.keywords);
    let mut body = String::new();
    for index in order {
        if body.chars().count() >= limits.summary_char_budget {
            break;
        }
        let (number, text) = &pages[index];
        let _ = writeln!(body, "=== Page {} ===", number);
        let _ = writeln!(body, "{}", text.trim());
    }

    Ok(Analysis {
        title: format!("PDF document ({} pages)", pages.len()),
        body,
    })
}

fn rank_pages(pages: &[(u32, String)], keywords: &[String]) -> Vec<usize> {
    let hits = |text: &str| {
        let lower = text.to_lowercase();
        keywords.iter().map(|k| lower.matches(k.as_str()).count()).sum::<usize>()
    };
    let mut rest: Vec<(usize, usize)> = pages
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, (_, text))| (i, hits(text)))
        .collect();
    rest.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    std::iter::once(0).chain(rest.into_iter().map(|(i, _)| i)).collect()
}
