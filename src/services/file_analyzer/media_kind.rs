//! 媒体类型识别：Content-Type → 扩展名 → 魔数/内容嗅探

use crate::models::{artifact::file_name, MediaKind};

impl MediaKind {
    /// 识别文件类型
    ///
    /// 具体的 Content-Type 优先；`application/octet-stream`、`text/*`、`application/vnd.ms-excel`
    /// 这类笼统或常被误用的类型交给扩展名判断，扩展名也没有时再看内容
    pub fn detect(content_type: Option<&str>, url: &str, bytes: &[u8]) -> MediaKind {
        let mime = content_type
            .and_then(|c| c.split(';').next())
            .map(|c| c.trim().to_ascii_lowercase())
            .unwrap_or_default();

        Self::from_mime(&mime)
            .or_else(|| extension(url).and_then(|ext| Self::from_extension(&ext)))
            .or_else(|| Self::sniff(bytes))
            .or_else(|| Self::from_weak_mime(&mime))
            .unwrap_or(MediaKind::Binary)
    }

    /// 只在扩展名和内容都判断不出时才采用的类型
    fn from_weak_mime(mime: &str) -> Option<MediaKind> {
        match mime {
            // 很多服务器把 .csv 也标成 vnd.ms-excel
            "application/vnd.ms-excel" => Some(MediaKind::Spreadsheet),
            m if m.starts_with("text/") => Some(MediaKind::Document),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<MediaKind> {
        let kind = match mime {
            "" | "application/octet-stream" | "binary/octet-stream" | "text/plain"
            | "application/download" | "application/force-download"
            | "application/vnd.ms-excel" => return None,
            "text/csv" | "application/csv" | "text/tab-separated-values" | "text/comma-separated-values"
            | "text/x-csv" | "application/x-csv" | "text/x-comma-separated-values" | "text/tsv" => {
                MediaKind::Tabular
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.oasis.opendocument.spreadsheet" => MediaKind::Spreadsheet,
            "application/pdf" | "text/html" | "application/xhtml+xml" | "text/markdown" => {
                MediaKind::Document
            }
            "application/json" | "application/x-ndjson" | "application/ld+json" => {
                MediaKind::StructuredText
            }
            m if m.ends_with("+json") => MediaKind::StructuredText,
            m if m.starts_with("image/") || m.starts_with("audio/") || m.starts_with("video/") => {
                MediaKind::Binary
            }
            "application/zip" | "application/gzip" => MediaKind::Binary,
            _ => return None,
        };
        Some(kind)
    }

    fn from_extension(ext: &str) -> Option<MediaKind> {
        let kind = match ext {
            "csv" | "tsv" => MediaKind::Tabular,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => MediaKind::Spreadsheet,
            "pdf" | "txt" | "md" | "html" | "htm" | "log" | "xml" => MediaKind::Document,
            "json" | "ndjson" | "jsonl" | "geojson" => MediaKind::StructuredText,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "mp3" | "wav" | "ogg" | "mp4"
            | "zip" | "gz" => MediaKind::Binary,
            _ => return None,
        };
        Some(kind)
    }

    fn sniff(bytes: &[u8]) -> Option<MediaKind> {
        if bytes.starts_with(b"%PDF") {
            return Some(MediaKind::Document);
        }
        // xlsx 是 zip 容器，xls 是 OLE 容器
        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            return Some(MediaKind::Spreadsheet);
        }
        let text = std::str::from_utf8(bytes).ok()?;
        let trimmed = text.trim_start_matches('\u{feff}').trim_start();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with(['{', '[']) && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
            return Some(MediaKind::StructuredText);
        }
        if looks_delimited(trimmed) {
            return Some(MediaKind::Tabular);
        }
        Some(MediaKind::Document)
    }
}

/// URL 最后一段路径的小写扩展名
pub fn extension(url: &str) -> Option<String> {
    let name = file_name(url);
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 8).then(|| ext.to_ascii_lowercase())
}

/// 前几行的分隔符数量一致且大于 0
fn looks_delimited(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(5).collect();
    if lines.len() < 2 {
        return false;
    }
    [',', '\t', ';'].iter().any(|&d| {
        let first = lines[0].matches(d).count();
        first > 0 && lines.iter().all(|l| l.matches(d).count() == first)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_mime_wins() {
        assert_eq!(
            MediaKind::detect(Some("text/csv; charset=utf-8"), "https://x.io/data", b""),
            MediaKind::Tabular
        );
        assert_eq!(
            MediaKind::detect(Some("application/pdf"), "https://x.io/a.csv", b""),
            MediaKind::Document
        );
    }

    #[test]
    fn test_generic_mime_falls_back_to_extension() {
        assert_eq!(
            MediaKind::detect(Some("application/octet-stream"), "https://x.io/sales.xlsx?dl=1", b""),
            MediaKind::Spreadsheet
        );
        assert_eq!(
            MediaKind::detect(Some("text/plain"), "https://x.io/a.json", b"{}"),
            MediaKind::StructuredText
        );
    }

    #[test]
    fn test_csv_mime_aliases_are_tabular() {
        for ct in ["text/comma-separated-values", "text/x-csv", "application/x-csv", "text/tsv"] {
            assert_eq!(
                MediaKind::detect(Some(ct), "https://x.io/download", b""),
                MediaKind::Tabular,
                "{}",
                ct
            );
        }
    }

    #[test]
    fn test_weak_mime_yields_to_extension_and_content() {
        let csv = b"name,score\nalice,80\nbob,90\n";
        assert_eq!(
            MediaKind::detect(Some("application/vnd.ms-excel"), "https://x.io/scores.csv", csv),
            MediaKind::Tabular
        );
        assert_eq!(
            MediaKind::detect(Some("application/vnd.ms-excel"), "https://x.io/get", csv),
            MediaKind::Tabular
        );
        assert_eq!(
            MediaKind::detect(Some("application/vnd.ms-excel"), "https://x.io/get", &[0xD0, 0xCF, 0x11, 0xE0]),
            MediaKind::Spreadsheet
        );
        assert_eq!(
            MediaKind::detect(Some("text/x-unknown"), "https://x.io/scores.csv", csv),
            MediaKind::Tabular
        );
        assert_eq!(
            MediaKind::detect(Some("text/x-unknown"), "https://x.io/notes", b"just some words"),
            MediaKind::Document
        );
    }

    #[test]
    fn test_content_sniffing() {
        assert_eq!(MediaKind::detect(None, "https://x.io/get", b"%PDF-1.7"), MediaKind::Document);
        assert_eq!(
            MediaKind::detect(None, "https://x.io/get", b"a,b\n1,2\n3,4\n"),
            MediaKind::Tabular
        );
        assert_eq!(
            MediaKind::detect(None, "https://x.io/get", br#"[{"a": 1}]"#),
            MediaKind::StructuredText
        );
        assert_eq!(
            MediaKind::detect(None, "https://x.io/get", &[0xFF, 0xFE, 0x00, 0x01]),
            MediaKind::Binary
        );
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("https://x.io/files/Report.PDF"), Some("pdf".to_string()));
        assert_eq!(extension("https://x.io/files/"), None);
    }
}
