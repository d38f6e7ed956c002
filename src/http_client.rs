//! HTTP 客户端构建
//!
//! 供密钥验证使用，密钥池本身不发起任何网络请求

use reqwest::{Client, Proxy};
use std::time::Duration;

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// 代理地址（http/https/socks5）
    pub url: String,
    /// 认证用户名
    pub username: Option<String>,
    /// 认证密码
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// 设置代理认证
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// 构建 HTTP 客户端
///
/// # Arguments
/// * `proxy` - 可选的代理配置
/// * `timeout_secs` - 请求超时（秒）
pub fn build_client(proxy: Option<&ProxyConfig>, timeout_secs: u64) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .use_rustls_tls();

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(&proxy_config.url)?;
        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password)
        {
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
        tracing::debug!("HTTP 客户端使用代理: {}", proxy_config.url);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_config_with_auth() {
        let proxy = ProxyConfig::new("socks5://127.0.0.1:1080").with_auth("user", "pass");
        assert_eq!(proxy.url, "socks5://127.0.0.1:1080");
        assert_eq!(proxy.username, Some("user".to_string()));
        assert_eq!(proxy.password, Some("pass".to_string()));
    }

    #[test]
    fn test_build_client_without_proxy() {
        assert!(build_client(None, 5).is_ok());
    }

    #[test]
    fn test_build_client_with_proxy() {
        let proxy = ProxyConfig::new("http://127.0.0.1:8080").with_auth("u", "p");
        assert!(build_client(Some(&proxy), 5).is_ok());
    }
}
