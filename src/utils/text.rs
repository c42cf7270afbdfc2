//! LLM 输出的文本处理

/// 去掉 markdown 代码块包裹
///
/// 优先取 ```json 块，其次取第一个 ``` 块，否则原样返回
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.split_once("```json").map(|(_, rest)| rest) {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some(rest) = text.split_once("```").map(|(_, rest)| rest) {
        let body = rest.split("```").next().unwrap_or(rest);
        // 去掉语言标记行
        let body = match body.split_once('\n') {
            Some((first, remainder)) if !first.trim().contains(' ') && !first.trim().is_empty() => {
                if first.trim().starts_with(['{', '[']) {
                    body
                } else {
                    remainder
                }
            }
            _ => body,
        };
        return body.trim();
    }
    text
}

/// 按字符数截断，不追加省略号
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let raw = "好的：\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_plain_fence_with_language_tag() {
        assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(strip_code_fences("```\n{\"b\": 2}\n```"), "{\"b\": 2}");
    }

    #[test]
    fn test_no_fence_is_trimmed() {
        assert_eq!(strip_code_fences("  42 \n"), "42");
    }

    #[test]
    fn test_clip_chars() {
        assert_eq!(clip_chars("数据分析", 2), "数据");
        assert_eq!(clip_chars("ab", 5), "ab");
    }
}
