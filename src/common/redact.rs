//! 敏感信息脱敏

/// 保留的前缀字符数
const KEEP_PREFIX: usize = 8;
/// 保留的后缀字符数
const KEEP_SUFFIX: usize = 3;

/// 密钥脱敏：保留前 8 位和后 3 位，中间以 `...` 代替
///
/// 长度不足以同时保留首尾时整体替换为 `***`，避免泄露完整密钥
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= KEEP_PREFIX + KEEP_SUFFIX {
        return "***".to_string();
    }

    let prefix: String = chars[..KEEP_PREFIX].iter().collect();
    let suffix: String = chars[chars.len() - KEEP_SUFFIX..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
