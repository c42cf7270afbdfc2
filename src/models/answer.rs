//! 答案模型与形态校验

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

use crate::error::SynthesisError;
use crate::models::AnswerKind;

/// 答案在线上的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    Number,
    String,
    Boolean,
    Json,
    Base64DataUri,
}

impl EncodingKind {
    pub fn for_kind(kind: AnswerKind) -> Self {
        match kind {
            AnswerKind::Number => EncodingKind::Number,
            AnswerKind::String => EncodingKind::String,
            AnswerKind::Boolean => EncodingKind::Boolean,
            AnswerKind::StructuredObject => EncodingKind::Json,
            AnswerKind::EncodedBinary => EncodingKind::Base64DataUri,
        }
    }
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodingKind::Number => "number",
            EncodingKind::String => "string",
            EncodingKind::Boolean => "boolean",
            EncodingKind::Json => "json",
            EncodingKind::Base64DataUri => "base64-data-uri",
        };
        f.write_str(name)
    }
}

/// 已校验的答案
///
/// 只能通过 [`Answer::new`] 构建，因此值的形态一定和期望类型一致
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    value: JsonValue,
    encoding_kind: EncodingKind,
}

impl Answer {
    /// 校验值的形态后构建答案
    pub fn new(value: JsonValue, expected: AnswerKind) -> Result<Self, SynthesisError> {
        let valid = match expected {
            AnswerKind::Number => value.is_number(),
            AnswerKind::String => value.is_string(),
            AnswerKind::Boolean => value.is_boolean(),
            AnswerKind::StructuredObject => value.is_object() || value.is_array(),
            AnswerKind::EncodedBinary => value.as_str().is_some_and(is_data_uri),
        };

        if !valid {
            return Err(SynthesisError::ShapeMismatch {
                expected,
                got: describe(&value),
            });
        }

        Ok(Self {
            value,
            encoding_kind: EncodingKind::for_kind(expected),
        })
    }

    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn encoding_kind(&self) -> EncodingKind {
        self.encoding_kind
    }
}

fn data_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:([\w.+-]+/[\w.+-]+)((?:;[\w.+-]+=[\w.+-]+)*);base64,([A-Za-z0-9+/]*={0,2})$")
            .expect("data uri regex")
    })
}

/// 是否是自描述的 base64 data URI（媒体类型 + 可解码的负载）
pub fn is_data_uri(text: &str) -> bool {
    let Some(caps) = data_uri_regex().captures(text.trim()) else {
        return false;
    };
    let payload = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
    !payload.is_empty() && BASE64.decode(payload).is_ok()
}

/// 用于错误信息的值描述
fn describe(value: &JsonValue) -> String {
    let kind = match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    };
    let preview: String = value.to_string().chars().take(60).collect();
    format!("{} ({})", kind, preview)
}
