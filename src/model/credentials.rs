//! API 密钥与端点提取
//!
//! 从原始配置文本中按模式提取 Gemini API Key，并解析逗号分隔的端点列表

use regex::Regex;
use std::collections::HashSet;

use crate::common::redact::mask_key;
use crate::pool::PoolError;

/// 默认的 Gemini API Key 匹配模式
pub const DEFAULT_KEY_PATTERN: &str = r"AIzaSy[a-zA-Z0-9_-]{33}";

/// 默认 API 端点
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// 编译密钥匹配模式
pub fn compile_key_pattern(pattern: &str) -> Result<Regex, PoolError> {
    Regex::new(pattern).map_err(|source| PoolError::InvalidKeyPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// 从文本中提取所有匹配的密钥（按出现顺序）
pub fn extract_api_keys(text: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 依次从多个来源提取密钥并去重
///
/// 保留首次出现的顺序，重复的密钥只记录警告
pub fn collect_api_keys<I, S>(sources: I, pattern: &Regex) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for source in sources {
        for key in extract_api_keys(source.as_ref(), pattern) {
            if seen.insert(key.clone()) {
                keys.push(key);
            } else {
                tracing::warn!("忽略重复的 API Key: {}", mask_key(&key));
            }
        }
    }

    keys
}

/// 解析逗号分隔的端点配置
///
/// 去除首尾空白和末尾的 `/`，丢弃空项
pub fn split_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(tail: char) -> String {
        format!("AIzaSy{}", tail.to_string().repeat(33))
    }

    fn default_pattern() -> Regex {
        compile_key_pattern(DEFAULT_KEY_PATTERN).unwrap()
    }

    #[test]
    fn test_extract_api_keys_from_mixed_text() {
        let a = sample_key('a');
        let b = sample_key('B');
        let text = format!("{}, junk AIzaSyshort {};{}", a, b, "not-a-key");

        let keys = extract_api_keys(&text, &default_pattern());
        assert_eq!(keys, vec![a, b]);
    }

    #[test]
    fn test_extract_api_keys_allows_dash_and_underscore() {
        let key = format!("AIzaSy{}", "-_".repeat(16) + "z");
        assert_eq!(key.len(), 39);
        assert_eq!(extract_api_keys(&key, &default_pattern()), vec![key]);
    }

    #[test]
    fn test_extract_api_keys_empty() {
        assert!(extract_api_keys("", &default_pattern()).is_empty());
        assert!(extract_api_keys("nothing here", &default_pattern()).is_empty());
    }

    #[test]
    fn test_collect_api_keys_dedupes_across_sources() {
        let a = sample_key('a');
        let b = sample_key('b');
        let c = sample_key('c');
        let sources = vec![format!("{},{}", a, b), format!("{} {}", b, c), a.clone()];

        let keys = collect_api_keys(&sources, &default_pattern());
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn test_compile_key_pattern_invalid() {
        let err = compile_key_pattern("[").unwrap_err();
        assert!(err.is_invalid_key_pattern());
    }

    #[test]
    fn test_custom_key_pattern() {
        let pattern = compile_key_pattern(r"sk-[0-9]{4}").unwrap();
        let keys = extract_api_keys("sk-1234 sk-12 sk-9876", &pattern);
        assert_eq!(keys, vec!["sk-1234", "sk-9876"]);
    }

    #[test]
    fn test_split_endpoints_single() {
        assert_eq!(
            split_endpoints("https://generativelanguage.googleapis.com"),
            vec!["https://generativelanguage.googleapis.com"]
        );
    }

    #[test]
    fn test_split_endpoints_multiple_trimmed() {
        let endpoints = split_endpoints(" https://a.example.com/ ,https://b.example.com,, ");
        assert_eq!(endpoints, vec!["https://a.example.com", "https://b.example.com"]);
    }

    #[test]
    fn test_split_endpoints_empty() {
        assert!(split_endpoints("").is_empty());
        assert!(split_endpoints(" , ").is_empty());
    }
}
