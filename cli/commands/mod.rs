//! CLI 子命令

pub mod keys;
pub mod validate;

use anyhow::{Context, Result};

use gemini_key_pool::model::config::Config;
use gemini_key_pool::pool::KeyPool;

/// 加载配置（文件 + 环境变量）并构建密钥池
pub fn load_pool(config_path: &str) -> Result<(Config, KeyPool)> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("加载配置文件失败: {}", config_path))?;
    config.apply_env();

    if let Err(errors) = config.validate() {
        anyhow::bail!("配置验证失败:\n  - {}", errors.join("\n  - "));
    }

    let pool = KeyPool::from_config(&config)?;
    Ok((config, pool))
}
