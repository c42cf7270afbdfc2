//! 题目抽取服务 - 业务能力层
//!
//! 把渲染后的页面变成 [`QuizDescriptor`]：
//! 1. LLM 读页面文字和链接，输出 JSON
//! 2. 启发式扫描补齐 LLM 漏掉的字段
//! 3. 相对地址按页面地址解析

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ExtractionError;
use crate::infrastructure::{complete_with_retry, LanguageModel, Prompt, ResponseShape};
use crate::models::{AnswerKind, QuizDescriptor, RenderedPage, SubmissionEndpoint};
use crate::services::page_heuristics::{self, guess_answer_kind, resolve, HeuristicScan};
use crate::utils::text::{clip_chars, strip_code_fences};
use crate::utils::{truncate_text, RetryPolicy};

const PAGE_TEXT_BUDGET: usize = 12_000;

const SYSTEM_PROMPT: &str = "You extract quiz tasks from web pages. \
The page contains a question, possibly links to data files, and instructions on where to POST the answer. \
Return a JSON object with these keys:\n\
- \"question\": the full question text the answer must respond to\n\
- \"submit_url\": the URL where the answer must be POSTed (absolute or as written on the page)\n\
- \"file_urls\": array of URLs of files needed to answer (data files, documents, images); empty if none\n\
- \"answer_kind\": one of \"number\", \"string\", \"boolean\", \"structured-object\", \"encoded-binary\"\n\
- \"answer_field\": the JSON field name the answer goes in, if the page names one other than \"answer\"\n\
- \"extra_fields\": object of additional fields the page says to include in the submission, if any\n\
- \"instructions\": any formatting rules or extra context for the answer\n\
Do not invent URLs that are not on the page.";

/// LLM 的原始输出
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    question: Option<String>,
    #[serde(alias = "submission_url", alias = "submit_endpoint")]
    submit_url: Option<String>,
    #[serde(alias = "files", alias = "file_references")]
    file_urls: Option<Vec<String>>,
    #[serde(alias = "answer_type", alias = "expected_answer_kind")]
    answer_kind: Option<String>,
    answer_field: Option<String>,
    extra_fields: Option<Map<String, JsonValue>>,
    #[serde(alias = "context")]
    instructions: Option<String>,
}

pub struct PageExtractor {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl PageExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// 抽取题目
    ///
    /// LLM 失败或输出无法解析时，启发式结果足够（题目 + 提交地址）就继续，否则返回错误
    pub async fn extract(&self, page: &RenderedPage) -> Result<QuizDescriptor, ExtractionError> {
        let scan = page_heuristics::scan(page);
        debug!(
            "启发式扫描: 提交候选 {} 个, 文件链接 {} 个",
            scan.submit_candidates.len(),
            scan.file_links.len()
        );

        let prompt = build_prompt(page, &scan);
        let llm = match complete_with_retry(self.model.as_ref(), &prompt, ResponseShape::Json, self.retry).await {
            Ok(response) => {
                debug!("抽取响应: {}", truncate_text(&response, 300));
                parse_extraction(&response).map_err(ExtractionError::Malformed)
            }
            Err(e) => Err(ExtractionError::Model(e)),
        };

        let (raw, llm_error) = match llm {
            Ok(raw) => (raw, None),
            Err(e) => {
                warn!("⚠️ LLM 抽取失败，尝试启发式兜底: {}", e);
                (RawExtraction::default(), Some(e))
            }
        };

        match merge(raw, scan, page) {
            Ok(descriptor) => {
                info!(
                    "✓ 题目抽取完成: {} | 提交到 {} | {} 个文件 | 答案类型 {}",
                    truncate_text(&descriptor.question_text, 60),
                    descriptor.submission_endpoint.url,
                    descriptor.file_references.len(),
                    descriptor.expected_answer_kind
                );
                Ok(descriptor)
            }
            // LLM 本身的错误比"缺字段"更能说明问题
            Err(missing) => Err(llm_error.unwrap_or(missing)),
        }
    }
}

fn build_prompt(page: &RenderedPage, scan: &HeuristicScan) -> Prompt {
    let text = if page.text.trim().is_empty() {
        scan.question.clone().unwrap_or_default()
    } else {
        page.text.clone()
    };

    let mut links: Vec<&String> = scan.submit_candidates.iter().collect();
    links.extend(&scan.file_links);
    links.extend(&scan.links);
    let links = if links.is_empty() {
        "(none)".to_string()
    } else {
        links.iter().map(|l| format!("- {}", l)).collect::<Vec<_>>().join("\n")
    };

    let user = format!(
        "Page URL: {}\n\nPage text:\n{}\n\nLinks and form targets on the page:\n{}",
        page.final_url,
        clip_chars(&text, PAGE_TEXT_BUDGET),
        links
    );
    Prompt::new(SYSTEM_PROMPT, user)
}

/// 解析 LLM 输出；去掉代码块，必要时截取第一个 `{` 到最后一个 `}`
fn parse_extraction(response: &str) -> Result<RawExtraction, String> {
    let body = strip_code_fences(response);
    match serde_json::from_str::<RawExtraction>(body) {
        Ok(raw) => Ok(raw),
        Err(first) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(first.to_string());
            };
            if start >= end {
                return Err(first.to_string());
            }
            serde_json::from_str::<RawExtraction>(&body[start..=end]).map_err(|_| first.to_string())
        }
    }
}

fn merge(raw: RawExtraction, scan: HeuristicScan, page: &RenderedPage) -> Result<QuizDescriptor, ExtractionError> {
    let base = Url::parse(&page.final_url).ok();

    let question_text = raw
        .question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .or(scan.question)
        .ok_or(ExtractionError::NoQuestion)?;

    let submit_url = raw
        .submit_url
        .as_deref()
        .and_then(|u| resolve(base.as_ref(), u))
        .or_else(|| scan.submit_candidates.first().cloned())
        .ok_or(ExtractionError::NoSubmissionTarget)?;

    let mut file_references: Vec<String> = Vec::new();
    let llm_files = raw
        .file_urls
        .iter()
        .flatten()
        .filter_map(|u| resolve(base.as_ref(), u));
    for url in llm_files.chain(scan.file_links) {
        if url != submit_url && !file_references.contains(&url) {
            file_references.push(url);
        }
    }

    let expected_answer_kind = raw
        .answer_kind
        .as_deref()
        .and_then(AnswerKind::from_label)
        .unwrap_or_else(|| guess_answer_kind(&question_text));

    let mut endpoint = SubmissionEndpoint::new(submit_url);
    if let Some(field) = raw.answer_field.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
        endpoint.answer_field = field;
    }
    if let Some(extra) = raw.extra_fields {
        endpoint.extra_fields = extra;
    }

    Ok(QuizDescriptor {
        question_text,
        submission_endpoint: endpoint,
        file_references,
        expected_answer_kind,
        raw_context: raw.instructions.unwrap_or_default(),
        page_url: page.final_url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::ModelError;

    struct CannedModel(Result<String, ()>);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _prompt: &Prompt, _shape: ResponseShape) -> Result<String, ModelError> {
            self.0.clone().map_err(|_| ModelError::Api {
                model: "canned".into(),
                message: "quota".into(),
            })
        }
    }

    fn page() -> RenderedPage {
        RenderedPage {
            html: r#"<body><p>Compute the mean of score.</p><a href="data/scores.csv">data</a><form action="/submit"></form></body>"#.into(),
            text: "Compute the mean of score.".into(),
            final_url: "https://quiz.example.com/q/1".into(),
        }
    }

    fn extractor(response: Result<String, ()>) -> PageExtractor {
        PageExtractor::new(Arc::new(CannedModel(response)), RetryPolicy::NONE)
    }

    #[tokio::test]
    async fn test_llm_fields_are_resolved_against_page_url() {
        let response = r#"```json
        {"question": "What is the mean score?", "submit_url": "/submit", "file_urls": ["data/scores.csv"],
         "answer_kind": "number", "answer_field": "result", "extra_fields": {"task": "q1"}}
        ```"#;
        let quiz = extractor(Ok(response.into())).extract(&page()).await.unwrap();

        assert_eq!(quiz.question_text, "What is the mean score?");
        assert_eq!(quiz.submission_endpoint.url, "https://quiz.example.com/submit");
        assert_eq!(quiz.submission_endpoint.answer_field, "result");
        assert_eq!(quiz.submission_endpoint.extra_fields["task"], "q1");
        assert_eq!(quiz.file_references, vec!["https://quiz.example.com/q/data/scores.csv"]);
        assert_eq!(quiz.expected_answer_kind, AnswerKind::Number);
        assert_eq!(quiz.page_url, "https://quiz.example.com/q/1");
    }

    #[tokio::test]
    async fn test_heuristics_fill_missing_fields() {
        let quiz = extractor(Ok(r#"{"question": "Mean of score?"}"#.into()))
            .extract(&page())
            .await
            .unwrap();
        assert_eq!(quiz.submission_endpoint.url, "https://quiz.example.com/submit");
        assert_eq!(quiz.file_references, vec!["https://quiz.example.com/q/data/scores.csv"]);
        assert_eq!(quiz.expected_answer_kind, AnswerKind::Number);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_heuristics() {
        let quiz = extractor(Err(())).extract(&page()).await.unwrap();
        assert!(quiz.question_text.contains("Compute the mean"));
        assert_eq!(quiz.submission_endpoint.url, "https://quiz.example.com/submit");
    }

    #[tokio::test]
    async fn test_no_submission_target() {
        let bare = RenderedPage {
            html: "<body><p>Just a question?</p></body>".into(),
            text: "Just a question?".into(),
            final_url: "https://quiz.example.com/q/2".into(),
        };
        let err = extractor(Ok(r#"{"question": "Just a question?"}"#.into()))
            .extract(&bare)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoSubmissionTarget));
    }

    #[tokio::test]
    async fn test_malformed_response_without_fallback() {
        let bare = RenderedPage {
            html: "<body></body>".into(),
            text: String::new(),
            final_url: "https://quiz.example.com/q/3".into(),
        };
        let err = extractor(Ok("I cannot help with that".into()))
            .extract(&bare)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(_)));
    }

    #[test]
    fn test_parse_extraction_tolerates_prose_around_json() {
        let raw = parse_extraction("Here you go: {\"question\": \"q\", \"files\": [\"a.csv\"]} hope it helps").unwrap();
        assert_eq!(raw.question.as_deref(), Some("q"));
        assert_eq!(raw.file_urls, Some(vec!["a.csv".to_string()]));
    }
}
