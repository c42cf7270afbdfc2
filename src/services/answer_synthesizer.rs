//! 答案合成服务 - 业务能力层
//!
//! 题目 + 文件摘要 → LLM → 按期望类型强制转换 → [`Answer`]
//!
//! 类型不匹配时带着纠正提示再问一次，仍不匹配则返回 `ShapeMismatch`

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Number, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::SynthesisError;
use crate::infrastructure::{complete_with_retry, LanguageModel, Prompt, ResponseShape};
use crate::models::{Answer, AnswerKind, FileArtifact, QuizDescriptor};
use crate::utils::text::strip_code_fences;
use crate::utils::{truncate_text, RetryPolicy};

const SYSTEM_PROMPT: &str = "You are a precise data analyst solving a quiz. \
Use the question, the instructions and the file summaries to compute the answer. \
Think briefly if needed, then finish with a final line of the form `ANSWER: <value>`. \
The value after ANSWER: must be only the answer, in the requested format, with no units or commentary.";

pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// 生成答案
    ///
    /// 降级的文件以"不可用"的说明出现在 prompt 里，不会导致失败
    pub async fn synthesize(
        &self,
        quiz: &QuizDescriptor,
        files: &[FileArtifact],
    ) -> Result<Answer, SynthesisError> {
        let kind = quiz.expected_answer_kind;
        let prompt = build_prompt(quiz, files);

        let response = self.ask(&prompt).await?;
        let first_error = match coerce(&response, kind) {
            Ok(answer) => return Ok(answer),
            Err(e) => e,
        };

        warn!("⚠️ 答案形态不符，带纠正提示重试一次: {}", first_error);
        let correction = correction_prompt(&prompt, &response, kind);
        let response = self.ask(&correction).await?;
        let answer = coerce(&response, kind)?;
        info!("✓ 纠正后得到合法答案");
        Ok(answer)
    }

    async fn ask(&self, prompt: &Prompt) -> Result<String, SynthesisError> {
        let response = complete_with_retry(self.model.as_ref(), prompt, ResponseShape::Text, self.retry).await?;
        debug!("答案响应: {}", truncate_text(&response, 300));
        Ok(response)
    }
}

fn format_rule(kind: AnswerKind) -> &'static str {
    match kind {
        AnswerKind::Number => "a single number (digits only, optional decimal point and sign)",
        AnswerKind::String => "a plain string without surrounding quotes",
        AnswerKind::Boolean => "true or false",
        AnswerKind::StructuredObject => "a single valid JSON object or array",
        AnswerKind::EncodedBinary => {
            "a complete base64 data URI such as data:image/png;base64,... (media type included)"
        }
    }
}

fn build_prompt(quiz: &QuizDescriptor, files: &[FileArtifact]) -> Prompt {
    let mut user = String::new();
    let _ = writeln!(user, "Question:\n{}\n", quiz.question_text);
    if !quiz.raw_context.trim().is_empty() {
        let _ = writeln!(user, "Instructions:\n{}\n", quiz.raw_context.trim());
    }
    let _ = writeln!(
        user,
        "Required answer format: {}\n",
        format_rule(quiz.expected_answer_kind)
    );

    if files.is_empty() {
        let _ = writeln!(user, "No files are attached to this question.");
    }
    for (i, file) in files.iter().enumerate() {
        let _ = writeln!(
            user,
            "--- File {}: {} ({}) from {} ---",
            i + 1,
            file.file_name(),
            file.media_kind,
            file.source_url
        );
        match &file.summary.error {
            Some(error) => {
                let _ = writeln!(user, "[unavailable: {}]", error);
            }
            None => {
                let _ = writeln!(user, "{}\n{}", file.summary.title, file.summary.body);
            }
        }
    }

    Prompt::new(SYSTEM_PROMPT, user)
}

fn correction_prompt(original: &Prompt, previous: &str, kind: AnswerKind) -> Prompt {
    let user = format!(
        "{}\n\nYour previous reply was:\n{}\n\nThat answer is not valid: it must be {}. \
         Reply again and end with `ANSWER: <value>` in exactly that format.",
        original.user,
        truncate_text(previous, 2000),
        format_rule(kind)
    );
    Prompt::new(original.system.clone(), user)
}

fn answer_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\banswer\s*:").expect("valid answer marker regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?").expect("valid number regex"))
}

fn data_uri_search() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"data:[\w.+-]+/[\w.+-]+(?:;[\w.+-]+=[\w.+-]+)*;base64,[A-Za-z0-9+/]+={0,2}").expect("valid data uri regex"))
}

/// 取最后一个 `ANSWER:` 之后的文字；没有标记时用整段响应
fn answer_text(response: &str) -> &str {
    let start = answer_marker()
        .find_iter(response)
        .last()
        .map(|m| m.end())
        .unwrap_or(0);
    strip_code_fences(&response[start..])
}

/// 按期望类型把响应转成 JSON 值再校验
pub fn coerce(response: &str, kind: AnswerKind) -> Result<Answer, SynthesisError> {
    let text = answer_text(response);
    let value = match kind {
        AnswerKind::Number => coerce_number(text),
        AnswerKind::Boolean => coerce_bool(text),
        AnswerKind::String => coerce_string(text),
        AnswerKind::StructuredObject => coerce_structured(text),
        AnswerKind::EncodedBinary => data_uri_search()
            .find(text)
            .or_else(|| data_uri_search().find(response))
            .map(|m| JsonValue::String(m.as_str().to_string())),
    }
    .unwrap_or_else(|| JsonValue::String(text.to_string()));

    Answer::new(value, kind)
}

fn coerce_number(text: &str) -> Option<JsonValue> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('.')
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%' | '_' | ' '))
        .collect();
    let candidate = if cleaned.parse::<f64>().is_ok() {
        cleaned
    } else {
        number_regex().find(text)?.as_str().to_string()
    };

    if !candidate.contains(['.', 'e', 'E']) {
        if let Ok(i) = candidate.parse::<i64>() {
            return Some(JsonValue::from(i));
        }
    }
    let f = candidate.parse::<f64>().ok()?;
    Number::from_f64(f).map(JsonValue::Number)
}

fn coerce_bool(text: &str) -> Option<JsonValue> {
    let word = text
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();
    match word.as_str() {
        "true" | "yes" => Some(JsonValue::Bool(true)),
        "false" | "no" => Some(JsonValue::Bool(false)),
        _ => None,
    }
}

fn coerce_string(text: &str) -> Option<JsonValue> {
    let trimmed = text.trim();
    if let Ok(JsonValue::String(s)) = serde_json::from_str::<JsonValue>(trimmed) {
        return Some(JsonValue::String(s));
    }
    let unquoted = trimmed
        .strip_prefix(['"', '\'', '`'])
        .and_then(|t| t.strip_suffix(['"', '\'', '`']))
        .unwrap_or(trimmed);
    Some(JsonValue::String(unquoted.to_string()))
}

fn coerce_structured(text: &str) -> Option<JsonValue> {
    if let Ok(value) = serde_json::from_str::<JsonValue>(text) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (start < end)
        .then(|| serde_json::from_str::<JsonValue>(&text[start..=end]).ok())
        .flatten()
        .filter(|v| v.is_object() || v.is_array())
}
