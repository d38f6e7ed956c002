//! 密钥池错误类型定义

/// 密钥池操作错误
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// 未配置任何 API 端点
    #[error("未配置任何 API 端点")]
    NoEndpoints,

    /// 密钥不在池中
    #[error("密钥不在池中: {key_preview}")]
    UnknownCredential { key_preview: String },

    /// 密钥匹配模式无效
    #[error("密钥匹配模式无效: {pattern}: {source}")]
    InvalidKeyPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl PoolError {
    /// 检查是否为"未配置端点"错误
    pub fn is_no_endpoints(&self) -> bool {
        matches!(self, PoolError::NoEndpoints)
    }

    /// 检查是否为"密钥不在池中"错误
    pub fn is_unknown_credential(&self) -> bool {
        matches!(self, PoolError::UnknownCredential { .. })
    }

    /// 检查是否为"匹配模式无效"错误
    pub fn is_invalid_key_pattern(&self) -> bool {
        matches!(self, PoolError::InvalidKeyPattern { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(PoolError::NoEndpoints.is_no_endpoints());
        assert!(!PoolError::NoEndpoints.is_unknown_credential());

        let err = PoolError::UnknownCredential {
            key_preview: "AIzaSyAB...xyz".to_string(),
        };
        assert!(err.is_unknown_credential());
        assert!(err.to_string().contains("AIzaSyAB...xyz"));
    }

    #[test]
    fn test_invalid_pattern_message() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = PoolError::InvalidKeyPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(err.is_invalid_key_pattern());
        assert!(err.to_string().starts_with("密钥匹配模式无效: ("));
    }
}
