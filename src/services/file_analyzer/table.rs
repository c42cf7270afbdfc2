//! 表格统一模型与统计
//!
//! CSV、电子表格、JSON 对象数组都先转成 [`Table`]，再由这里生成同一种摘要

use std::collections::HashMap;
use std::fmt::Write as _;

use super::AnalysisLimits;

/// 单元格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    /// 从文本推断单元格类型
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || matches!(trimmed, "NA" | "N/A" | "NaN" | "null" | "None") {
            return Cell::Empty;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Cell::Number(n);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Cell::Bool(true),
            "false" => Cell::Bool(false),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// 表头 + 行
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// 补齐空列名与重复列名
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(columns.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        let columns = (0..width)
            .map(|i| {
                let base = columns
                    .get(i)
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                if *count > 1 {
                    format!("{}_{}", base, count)
                } else {
                    base
                }
            })
            .collect();
        Self { columns, rows }
    }

    fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows[row].get(column).unwrap_or(&Cell::Empty)
    }
}

/// 列的统计画像
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnProfile {
    Numeric {
        count: usize,
        sum: f64,
        mean: f64,
        std: Option<f64>,
        min: f64,
        max: f64,
    },
    Categorical {
        distinct: usize,
        capped: bool,
        top: Vec<(String, usize)>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub nulls: usize,
    pub profile: ColumnProfile,
}

/// 表格摘要：结构 + 统计 + 样例行
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub row_count: usize,
    pub columns: Vec<ColumnSummary>,
    pub header: Vec<String>,
    pub sample: Vec<Vec<String>>,
}

const TOP_VALUES: usize = 5;

pub fn summarize(table: &Table, limits: &AnalysisLimits) -> TableSummary {
    let columns = (0..table.columns.len())
        .map(|c| summarize_column(table, c, limits.distinct_value_cap))
        .collect();

    let sample = table
        .rows
        .iter()
        .take(limits.sample_rows)
        .map(|row| {
            (0..table.columns.len())
                .map(|c| row.get(c).map(Cell::display).unwrap_or_default())
                .collect()
        })
        .collect();

    TableSummary {
        row_count: table.rows.len(),
        columns,
        header: table.columns.clone(),
        sample,
    }
}

fn summarize_column(table: &Table, column: usize, distinct_cap: usize) -> ColumnSummary {
    let name = table.columns[column].clone();
    let mut nulls = 0;
    let mut numbers = Vec::new();
    let mut others = Vec::new();

    for row in 0..table.rows.len() {
        match table.cell(row, column) {
            Cell::Empty => nulls += 1,
            Cell::Number(n) => numbers.push(*n),
            other => others.push(other.display()),
        }
    }

    let profile = if numbers.is_empty() && others.is_empty() {
        ColumnProfile::Empty
    } else if others.is_empty() {
        numeric_profile(&numbers)
    } else {
        // 混合列按类别处理，数字也算作取值
        let values = numbers
            .iter()
            .map(|n| format_number(*n))
            .chain(others);
        categorical_profile(values, distinct_cap)
    };

    ColumnSummary {
        name,
        nulls,
        profile,
    }
}

fn numeric_profile(values: &[f64]) -> ColumnProfile {
    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let std = (count > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    });
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ColumnProfile::Numeric {
        count,
        sum,
        mean,
        std,
        min,
        max,
    }
}

fn categorical_profile(values: impl Iterator<Item = String>, distinct_cap: usize) -> ColumnProfile {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let distinct = counts.len();
    let mut top: Vec<(String, usize)> = counts.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_VALUES);

    ColumnProfile::Categorical {
        distinct: distinct.min(distinct_cap),
        capped: distinct > distinct_cap,
        top,
    }
}

/// 整数不带小数点，其余最多保留 6 位小数
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    // -0 也归为 0
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    // 绝对值很小时固定 6 位小数会丢掉有效数字，改用科学计数法保留 6 位有效数字
    if n.abs() < 1e-4 {
        let text = format!("{:.5e}", n);
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                format!("{}e{}", mantissa.trim_end_matches('0').trim_end_matches('.'), exp)
            }
            None => text,
        };
    }
    let text = format!("{:.6}", n);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl TableSummary {
    /// 渲染为 LLM 可读的文本
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} rows x {} columns", self.row_count, self.columns.len());
        let _ = writeln!(out, "Columns:");
        for column in &self.columns {
            match &column.profile {
                ColumnProfile::Numeric {
                    count,
                    sum,
                    mean,
                    std,
                    min,
                    max,
                } => {
                    let _ = writeln!(
                        out,
                        "- {} (numeric): count={}, nulls={}, min={}, max={}, mean={}, std={}, sum={}",
                        column.name,
                        count,
                        column.nulls,
                        format_number(*min),
                        format_number(*max),
                        format_number(*mean),
                        std.map(format_number).unwrap_or_else(|| "n/a".to_string()),
                        format_number(*sum),
                    );
                }
                ColumnProfile::Categorical {
                    distinct,
                    capped,
                    top,
                } => {
                    let top = top
                        .iter()
                        .map(|(value, n)| format!("{:?}({})", value, n))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let _ = writeln!(
                        out,
                        "- {} (categorical): distinct={}{}, nulls={}, top: {}",
                        column.name,
                        distinct,
                        if *capped { "+" } else { "" },
                        column.nulls,
                        top
                    );
                }
                ColumnProfile::Empty => {
                    let _ = writeln!(out, "- {} (empty): nulls={}", column.name, column.nulls);
                }
            }
        }
        if !self.sample.is_empty() {
            let _ = writeln!(out, "First {} rows:", self.sample.len());
            let _ = writeln!(out, "{}", self.header.join(" | "));
            for row in &self.sample {
                let _ = writeln!(out, "{}", row.join(" | "));
            }
        }
        out
    }
}
