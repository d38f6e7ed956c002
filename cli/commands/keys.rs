//! 密钥池查看与抽取命令

use anyhow::Result;

use gemini_key_pool::common::redact::mask_key;

use super::load_pool;

/// 列出所有密钥和端点
pub async fn list(config_path: &str) -> Result<()> {
    let (_, pool) = load_pool(config_path)?;
    pool.list_credentials();
    pool.list_endpoints();
    Ok(())
}

/// 按轮换顺序抽取密钥，并为每个密钥随机分配端点
pub async fn draw(config_path: &str, count: usize) -> Result<()> {
    let (_, pool) = load_pool(config_path)?;

    for i in 0..count {
        let Some(key) = pool.acquire_credential().await else {
            anyhow::bail!("没有可用的 API 密钥");
        };
        let endpoint = pool.random_endpoint().await?;
        println!("#{} {} → {}", i + 1, mask_key(&key), endpoint);
    }

    Ok(())
}
