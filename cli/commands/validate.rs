//! 密钥验证命令

use anyhow::{Context, Result};

use gemini_key_pool::http_client::build_client;
use gemini_key_pool::validation::validate_all;

use super::load_pool;

/// 验证所有配置的密钥
pub async fn run(config_path: &str, concurrency: Option<usize>) -> Result<()> {
    let (config, pool) = load_pool(config_path)?;

    if pool.credential_count() == 0 {
        println!("没有配置任何 API 密钥");
        return Ok(());
    }

    let client = build_client(config.proxy_config().as_ref(), config.validation_timeout_secs)
        .context("创建 HTTP 客户端失败")?;
    let concurrency = concurrency.unwrap_or(config.validation_concurrency);

    println!("正在验证 {} 个密钥（并发 {}）...\n", pool.credential_count(), concurrency);

    let reports = validate_all(&client, &pool, pool.credentials(), concurrency).await;

    let mut invalid = 0;
    for (i, report) in reports.iter().enumerate() {
        if report.valid {
            println!("  API Key{}: {} ✓ 有效", i, report.key_preview);
        } else {
            invalid += 1;
            println!("  API Key{}: {} ❌ 无效", i, report.key_preview);
        }
    }

    println!("\n有效: {}, 无效: {}", reports.len() - invalid, invalid);

    if invalid > 0 {
        anyhow::bail!("{} 个密钥验证失败", invalid);
    }
    Ok(())
}
