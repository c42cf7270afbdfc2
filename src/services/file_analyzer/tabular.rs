//! CSV / TSV 解析

use anyhow::{Context, Result};

use super::table::{summarize, Cell, Table};
use super::{Analysis, AnalysisLimits};

pub(crate) fn analyze(bytes: &[u8], limits: &AnalysisLimits) -> Result<Analysis> {
    let table = parse_delimited(bytes)?;
    let summary = summarize(&table, limits);
    Ok(Analysis {
        title: format!("CSV table ({} rows)", summary.row_count),
        body: summary.render(),
    })
}

/// 解析分隔文本为表格，首行为表头
pub fn parse_delimited(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let delimiter = sniff_delimiter(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("读取 CSV 表头失败")?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        anyhow::bail!("CSV 没有表头");
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV 第 {} 行格式错误", i + 2))?;
        rows.push(record.iter().map(Cell::parse).collect());
    }

    Ok(Table::new(headers, rows))
}

/// 在首行里数候选分隔符，取最多的一个
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(bytes);
    [b',', b'\t', b';', b'|']
        .into_iter()
        .map(|d| (d, first_line.iter().filter(|&&b| b == d).count()))
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::file_analyzer::ColumnProfile;

    #[test]
    fn test_mean_of_score_column() {
        let csv = "name,score\nalice,80\nbob,90\ncarol,100\n";
        let analysis = analyze(csv.as_bytes(), &AnalysisLimits::default()).unwrap();
        assert!(analysis.title.contains("3 rows"));
        assert!(analysis.body.contains("score (numeric)"));
        assert!(analysis.body.contains("mean=90"));
    }

    #[test]
    fn test_tab_and_semicolon_delimiters() {
        let table = parse_delimited(b"a\tb\n1\t2\n").unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        let table = parse_delimited(b"x;y;z\n1;2;3\n").unwrap();
        assert_eq!(table.columns.len(), 3);
    }

    #[test]
    fn test_bom_and_ragged_rows() {
        let table = parse_delimited("\u{feff}id,value\n1,10\n2\n3,30,extra\n".as_bytes()).unwrap();
        assert_eq!(table.columns[0], "id");
        assert_eq!(table.columns.len(), 3);
        let summary = crate::services::file_analyzer::table::summarize(&table, &AnalysisLimits::default());
        assert_eq!(summary.columns[1].nulls, 1);
        assert!(matches!(summary.columns[1].profile, ColumnProfile::Numeric { count: 2, .. }));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse_delimited(b"").is_err());
    }
}
