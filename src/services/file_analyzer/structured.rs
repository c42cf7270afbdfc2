//! JSON / NDJSON：有界投影，扁平对象数组额外给出表格统计

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};

use super::table::{summarize, Cell, Table};
use super::{Analysis, AnalysisLimits};
use crate::utils::text::clip_chars;

const MAX_DEPTH: usize = 4;
const MAX_ITEMS: usize = 10;
const MAX_KEYS: usize = 30;
const MAX_STRING: usize = 200;

pub(crate) fn analyze(bytes: &[u8], limits: &AnalysisLimits) -> Result<Analysis> {
    let text = std::str::from_utf8(bytes).context("JSON 不是合法 UTF-8")?;
    let text = text.trim_start_matches('\u{feff}');
    let value = parse_json_or_lines(text)?;

    let mut body = String::new();
    if let Some(table) = flat_records(&value) {
        body.push_str("Records table:\n");
        body.push_str(&summarize(&table, limits).render());
        body.push('\n');
    }
    body.push_str("Structure:\n");
    body.push_str(&serde_json::to_string_pretty(&project(&value, 0))?);

    Ok(Analysis {
        title: format!("JSON {}", describe(&value)),
        body,
    })
}

/// 整体解析失败时按 NDJSON 逐行解析
fn parse_json_or_lines(text: &str) -> Result<JsonValue> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(whole) => {
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            if lines.len() < 2 {
                return Err(whole).context("JSON 解析失败");
            }
            let items = lines
                .iter()
                .map(|l| serde_json::from_str(l))
                .collect::<Result<Vec<JsonValue>, _>>()
                .map_err(|_| whole)
                .context("JSON 解析失败")?;
            Ok(JsonValue::Array(items))
        }
    }
}

fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Array(items) => format!("array ({} items)", items.len()),
        JsonValue::Object(map) => format!("object ({} keys)", map.len()),
        _ => "scalar".to_string(),
    }
}

/// 深度、数组长度、字符串长度都有上限的投影
fn project(value: &JsonValue, depth: usize) -> JsonValue {
    match value {
        JsonValue::String(s) if s.chars().count() > MAX_STRING => {
            JsonValue::String(format!("{}...", clip_chars(s, MAX_STRING)))
        }
        JsonValue::Array(items) if depth >= MAX_DEPTH => {
            JsonValue::String(format!("[... {} items]", items.len()))
        }
        JsonValue::Object(map) if depth >= MAX_DEPTH => {
            JsonValue::String(format!("{{... {} keys}}", map.len()))
        }
        JsonValue::Array(items) => {
            let mut projected: Vec<JsonValue> =
                items.iter().take(MAX_ITEMS).map(|v| project(v, depth + 1)).collect();
            if items.len() > MAX_ITEMS {
                projected.push(JsonValue::String(format!("... {} more items", items.len() - MAX_ITEMS)));
            }
            JsonValue::Array(projected)
        }
        JsonValue::Object(map) => {
            let mut projected: Map<String, JsonValue> = map
                .iter()
                .take(MAX_KEYS)
                .map(|(k, v)| (k.clone(), project(v, depth + 1)))
                .collect();
            if map.len() > MAX_KEYS {
                projected.insert("...".to_string(), format!("{} more keys", map.len() - MAX_KEYS).into());
            }
            JsonValue::Object(projected)
        }
        other => other.clone(),
    }
}

/// 对象数组且每个值都是标量时转成表格
fn flat_records(value: &JsonValue) -> Option<Table> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        let object = item.as_object()?;
        for (key, v) in object {
            if v.is_object() || v.is_array() {
                return None;
            }
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = items
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|object| {
            columns
                .iter()
                .map(|c| match object.get(c) {
                    None | Some(JsonValue::Null) => Cell::Empty,
                    Some(JsonValue::Number(n)) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
                    Some(JsonValue::Bool(b)) => Cell::Bool(*b),
                    Some(JsonValue::String(s)) => Cell::parse(s),
                    Some(other) => Cell::Text(other.to_string()),
                })
                .collect()
        })
        .collect();

    Some(Table::new(columns, rows))
}
