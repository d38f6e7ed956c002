//! API 密钥有效性验证
//!
//! 通过随机端点请求模型列表判断密钥是否可用，
//! 任何网络错误或非成功状态码都视为无效

use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::common::redact::mask_key;
use crate::pool::KeyPool;

/// 单个密钥的验证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// 脱敏后的密钥
    pub key_preview: String,
    /// 是否有效
    pub valid: bool,
}

/// 构建模型列表请求地址
pub fn models_url(endpoint: &str, key: &str) -> String {
    format!("{}/v1beta/models?key={}", endpoint.trim_end_matches('/'), key)
}

/// 验证单个密钥
///
/// 端点由密钥池随机选取；未配置端点、请求失败或状态码非 2xx 均返回 false
pub async fn validate_api_key(client: &Client, pool: &KeyPool, key: &str) -> bool {
    let endpoint = match pool.random_endpoint().await {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::warn!("无法验证密钥 {}: {}", mask_key(key), e);
            return false;
        }
    };

    let result = client
        .get(models_url(&endpoint, key))
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("密钥 {} 验证失败 ({}): {}", mask_key(key), endpoint, e);
            false
        }
    }
}

/// 并发验证多个密钥
///
/// 结果顺序与输入顺序一致
pub async fn validate_all(
    client: &Client,
    pool: &KeyPool,
    keys: &[String],
    concurrency: usize,
) -> Vec<ValidationReport> {
    stream::iter(keys)
        .map(|key| async move {
            ValidationReport {
                key_preview: mask_key(key),
                valid: validate_api_key(client, pool, key).await,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::build_client;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn key(tail: char) -> String {
        format!("AIzaSy{}", tail.to_string().repeat(33))
    }

    /// 启动本地模拟服务：请求中包含有效密钥时返回 200，否则返回 400
    async fn spawn_mock_server(valid_key: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let valid_key = valid_key.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let ok = request.starts_with("GET /v1beta/models?key=")
                        && request.contains(&format!("key={} ", valid_key));
                    let status = if ok { "200 OK" } else { "400 Bad Request" };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_models_url() {
        assert_eq!(
            models_url("https://generativelanguage.googleapis.com", "AIzaSyX"),
            "https://generativelanguage.googleapis.com/v1beta/models?key=AIzaSyX"
        );
        assert_eq!(
            models_url("https://proxy.example.com/", "k"),
            "https://proxy.example.com/v1beta/models?key=k"
        );
    }

    #[tokio::test]
    async fn test_validate_api_key_success_and_failure() {
        let endpoint = spawn_mock_server(key('g')).await;
        let pool = KeyPool::new(vec![key('g'), key('b')], vec![endpoint]);
        let client = build_client(None, 5).unwrap();

        assert!(validate_api_key(&client, &pool, &key('g')).await);
        assert!(!validate_api_key(&client, &pool, &key('b')).await);
    }

    #[tokio::test]
    async fn test_validate_api_key_unreachable_endpoint() {
        // 绑定后立即释放端口，确保连接被拒绝
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let pool = KeyPool::new(vec![key('a')], vec![format!("http://{}", addr)]);
        let client = build_client(None, 2).unwrap();
        assert!(!validate_api_key(&client, &pool, &key('a')).await);
    }

    #[tokio::test]
    async fn test_validate_api_key_without_endpoints() {
        let pool = KeyPool::new(vec![key('a')], Vec::new());
        let client = build_client(None, 2).unwrap();
        assert!(!validate_api_key(&client, &pool, &key('a')).await);
    }

    #[tokio::test]
    async fn test_validate_all_preserves_order() {
        let endpoint = spawn_mock_server(key('g')).await;
        let keys = vec![key('x'), key('g'), key('y')];
        let pool = KeyPool::new(keys.clone(), vec![endpoint]);
        let client = build_client(None, 5).unwrap();

        let reports = validate_all(&client, &pool, &keys, 2).await;
        let valid: Vec<bool> = reports.iter().map(|r| r.valid).collect();
        assert_eq!(valid, vec![false, true, false]);
        assert_eq!(reports[1].key_preview, mask_key(&key('g')));
    }
}
