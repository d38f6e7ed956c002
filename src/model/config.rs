use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::http_client::ProxyConfig;
use crate::model::credentials::{
    DEFAULT_API_ENDPOINT, DEFAULT_KEY_PATTERN, collect_api_keys, compile_key_pattern,
    split_endpoints,
};
use crate::pool::{PoolError, checked_deadline};

/// 主密钥环境变量
pub const ENV_API_KEYS: &str = "GEMINI_API_KEYS";
/// 端点环境变量（逗号分隔）
pub const ENV_API_ENDPOINTS: &str = "GEMINI_API_ENDPOINTS";
/// 临时禁用时长环境变量
pub const ENV_BLACKLIST_DURATION: &str = "BLACKLIST_DURATION_SECS";
/// 代理环境变量
pub const ENV_PROXY_URL: &str = "HTTP_PROXY_URL";
/// 附加密钥变量的最大编号（GEMINI_API_KEYS_1 ~ GEMINI_API_KEYS_98）
const MAX_EXTRA_KEY_VARS: usize = 98;

/// 密钥池应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// 密钥来源文本，每一项可包含多个 Key，按 keyPattern 提取
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// API 端点列表（每项也可为逗号分隔的多个端点）
    #[serde(default = "default_api_endpoints")]
    pub api_endpoints: Vec<String>,

    /// 密钥匹配模式
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,

    /// 临时禁用时长（秒，默认 60）
    #[serde(default = "default_blacklist_duration_secs")]
    pub blacklist_duration_secs: u64,

    /// 密钥验证请求超时（秒，默认 30）
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,

    /// 密钥验证并发数（默认 8）
    #[serde(default = "default_validation_concurrency")]
    pub validation_concurrency: usize,

    /// HTTP 代理地址（可选）
    /// 支持格式: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// 代理认证用户名（可选）
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// 代理认证密码（可选）
    #[serde(default)]
    pub proxy_password: Option<String>,
}

fn default_api_endpoints() -> Vec<String> {
    vec![DEFAULT_API_ENDPOINT.to_string()]
}

fn default_key_pattern() -> String {
    DEFAULT_KEY_PATTERN.to_string()
}

fn default_blacklist_duration_secs() -> u64 {
    60
}

fn default_validation_timeout_secs() -> u64 {
    30
}

fn default_validation_concurrency() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            api_endpoints: default_api_endpoints(),
            key_pattern: default_key_pattern(),
            blacklist_duration_secs: default_blacklist_duration_secs(),
            validation_timeout_secs: default_validation_timeout_secs(),
            validation_concurrency: default_validation_concurrency(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config/config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 用进程环境变量覆盖配置
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// 用给定的变量查询函数覆盖配置
    ///
    /// - `GEMINI_API_KEYS` 与 `GEMINI_API_KEYS_1..98` 存在时替换 apiKeys，
    ///   编号变量遇到第一个缺失或为空的即停止
    /// - `GEMINI_API_ENDPOINTS` 存在时替换 apiEndpoints
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup_non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut key_sources = Vec::new();
        if let Some(keys) = lookup_non_empty(ENV_API_KEYS) {
            key_sources.push(keys);
        }
        for i in 1..=MAX_EXTRA_KEY_VARS {
            match lookup_non_empty(&format!("{}_{}", ENV_API_KEYS, i)) {
                Some(keys) => key_sources.push(keys),
                None => break,
            }
        }
        if !key_sources.is_empty() {
            tracing::debug!("从环境变量读取到 {} 组密钥来源", key_sources.len());
            self.api_keys = key_sources;
        }

        if let Some(endpoints) = lookup_non_empty(ENV_API_ENDPOINTS) {
            self.api_endpoints = vec![endpoints];
        }

        if let Some(duration) = lookup_non_empty(ENV_BLACKLIST_DURATION) {
            match duration.trim().parse() {
                Ok(secs) => self.blacklist_duration_secs = secs,
                Err(e) => tracing::warn!(
                    "{} 无效，忽略: {} ({})",
                    ENV_BLACKLIST_DURATION,
                    duration,
                    e
                ),
            }
        }

        if let Some(proxy_url) = lookup_non_empty(ENV_PROXY_URL) {
            self.proxy_url = Some(proxy_url);
        }
    }

    /// 按 keyPattern 从所有来源提取去重后的密钥
    pub fn credentials(&self) -> Result<Vec<String>, PoolError> {
        let pattern = compile_key_pattern(&self.key_pattern)?;
        Ok(collect_api_keys(&self.api_keys, &pattern))
    }

    /// 展开后的端点列表
    pub fn endpoints(&self) -> Vec<String> {
        self.api_endpoints
            .iter()
            .flat_map(|raw| split_endpoints(raw))
            .collect()
    }

    /// 构建代理配置
    pub fn proxy_config(&self) -> Option<ProxyConfig> {
        let url = self.proxy_url.as_ref().filter(|u| !u.trim().is_empty())?;
        let mut proxy = ProxyConfig::new(url);
        if let (Some(username), Some(password)) = (&self.proxy_username, &self.proxy_password) {
            proxy = proxy.with_auth(username, password);
        }
        Some(proxy)
    }

    /// 验证配置有效性
    ///
    /// 收集所有问题后一并返回
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = compile_key_pattern(&self.key_pattern) {
            errors.push(e.to_string());
        }

        let endpoints = self.endpoints();
        if endpoints.is_empty() {
            errors.push("apiEndpoints 不能为空".to_string());
        }
        for endpoint in &endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(format!(
                    "apiEndpoints 格式不正确: {}，应以 http:// 或 https:// 开头",
                    endpoint
                ));
            }
        }

        // 检查代理 URL 格式
        if let Some(ref proxy_url) = self.proxy_url {
            if !proxy_url.is_empty()
                && !proxy_url.starts_with("http://")
                && !proxy_url.starts_with("https://")
                && !proxy_url.starts_with("socks5://")
            {
                errors.push(format!(
                    "proxyUrl 格式不正确: {}，应以 http://、https:// 或 socks5:// 开头",
                    proxy_url
                ));
            }
        }

        // 检查临时禁用时长是否可表示为截止时间
        let blacklist_duration = Duration::from_secs(self.blacklist_duration_secs);
        if checked_deadline(Utc::now(), blacklist_duration).is_none() {
            errors.push(format!(
                "blacklistDurationSecs 过大: {}，超出可表示的时间范围",
                self.blacklist_duration_secs
            ));
        }

        if self.validation_timeout_secs == 0 {
            errors.push("validationTimeoutSecs 不能为 0".to_string());
        }

        if self.validation_concurrency == 0 {
            errors.push("validationConcurrency 不能为 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
