//! 电子表格解析（xlsx / xls / ods），逐个工作表汇总

use std::fmt::Write as _;
use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::table::{summarize, Cell, Table};
use super::{Analysis, AnalysisLimits};

pub(crate) fn analyze(bytes: &[u8], limits: &AnalysisLimits) -> Result<Analysis> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).context("无法打开电子表格")?;
    let sheet_names = workbook.sheet_names().to_owned();
    if sheet_names.is_empty() {
        anyhow::bail!("电子表格没有工作表");
    }

    let mut body = String::new();
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .with_context(|| format!("读取工作表 {} 失败", name))?;
        let table = range_to_table(range.rows());
        let _ = writeln!(body, "=== Sheet: {} ===", name);
        if table.columns.is_empty() {
            let _ = writeln!(body, "(empty sheet)");
        } else {
            body.push_str(&summarize(&table, limits).render());
        }
        body.push('\n');
    }

    Ok(Analysis {
        title: format!("Spreadsheet ({} sheets)", sheet_names.len()),
        body,
    })
}

/// 第一行作为表头，其余为数据行；全空行跳过
fn range_to_table<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Table {
    let Some(header) = rows.next() else {
        return Table::default();
    };
    let columns = header.iter().map(|d| d.to_string()).collect();
    let rows = rows
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| *c != Cell::Empty))
        .collect();
    Table::new(columns, rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::parse(s),
        other => Cell::Text(other.to_string()),
    }
}
