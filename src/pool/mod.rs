//! 轮换密钥池
//!
//! 维护一个随机排列的密钥栈，每次请求从栈顶取出一个密钥，
//! 栈空时重新洗牌，保证每一轮内每个密钥恰好被取出一次：
//! - 取密钥时通过异步互斥锁保证"判空-洗牌-出栈"的原子性
//! - 端点列表构造后只读，随机选取无需加锁
//! - 支持临时禁用密钥，禁用期内的密钥不参与洗牌

mod blacklist;
mod error;

pub use blacklist::start_blacklist_sweeper;
pub use error::PoolError;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;

use crate::common::redact::mask_key;
use crate::model::config::Config;
use blacklist::Suspensions;

pub(crate) use blacklist::checked_deadline;

/// 默认临时禁用时长
const DEFAULT_BLACKLIST_DURATION: Duration = Duration::from_secs(60);

/// 轮换密钥池
///
/// 通过 `Arc<KeyPool>` 在各调用方之间共享
pub struct KeyPool {
    /// 全部密钥（构造后不再修改）
    credentials: Vec<String>,
    /// API 端点列表（构造后不再修改）
    endpoints: Vec<String>,
    /// 当前轮次剩余的随机密钥栈
    key_stack: TokioMutex<Vec<String>>,
    /// 临时禁用表
    suspensions: Suspensions,
    /// 默认临时禁用时长
    blacklist_duration: Duration,
    /// 出栈顺序记录（在临界区内写入）
    #[cfg(test)]
    draw_log: parking_lot::Mutex<Vec<String>>,
}

impl KeyPool {
    /// 创建密钥池
    ///
    /// 重复的密钥只保留首次出现的一个；允许空密钥列表（此时每次取密钥都返回 None）
    pub fn new(credentials: Vec<String>, endpoints: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let credentials: Vec<String> = credentials
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let mut initial_stack = credentials.clone();
        initial_stack.shuffle(&mut rand::thread_rng());

        Self {
            credentials,
            endpoints,
            key_stack: TokioMutex::new(initial_stack),
            suspensions: Suspensions::new(),
            blacklist_duration: DEFAULT_BLACKLIST_DURATION,
            #[cfg(test)]
            draw_log: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// 从配置创建密钥池
    pub fn from_config(config: &Config) -> Result<Self, PoolError> {
        let credentials = config.credentials()?;
        let endpoints = config.endpoints();
        tracing::info!(
            "已加载 {} 个 API 密钥, {} 个端点",
            credentials.len(),
            endpoints.len()
        );

        Ok(Self::new(credentials, endpoints)
            .with_blacklist_duration(Duration::from_secs(config.blacklist_duration_secs)))
    }

    /// 设置默认临时禁用时长
    pub fn with_blacklist_duration(mut self, duration: Duration) -> Self {
        self.blacklist_duration = duration;
        self
    }

    /// 获取一个密钥
    ///
    /// 栈空时重新洗牌后再出栈；没有任何可用密钥时记录错误并返回 None
    pub async fn acquire_credential(&self) -> Option<String> {
        let mut stack = self.key_stack.lock().await;

        if stack.is_empty() {
            *stack = self.shuffled_credentials();
        }

        if let Some(key) = stack.pop() {
            #[cfg(test)]
            self.draw_log.lock().push(key.clone());
            return Some(key);
        }
        drop(stack);

        if self.credentials.is_empty() {
            tracing::error!("没有配置任何 API 密钥！");
        }
        tracing::error!("没有可用的 API 密钥！");
        None
    }

    /// 随机选择一个端点（有放回）
    pub async fn random_endpoint(&self) -> Result<String, PoolError> {
        if self.endpoints.is_empty() {
            return Err(PoolError::NoEndpoints);
        }
        let index = fastrand::usize(..self.endpoints.len());
        Ok(self.endpoints[index].clone())
    }

    /// 输出所有密钥（脱敏）
    pub fn list_credentials(&self) {
        tracing::info!("当前可用 API Key 个数: {}", self.credentials.len());
        for (i, preview) in self.credential_previews().iter().enumerate() {
            tracing::info!("API Key{}: {}", i, preview);
        }
    }

    /// 输出所有端点
    pub fn list_endpoints(&self) {
        tracing::info!("当前配置的 API 端点个数: {}", self.endpoints.len());
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            tracing::info!("端点{}: {}", i, endpoint);
        }
    }

    /// 脱敏后的密钥列表（按配置顺序）
    pub fn credential_previews(&self) -> Vec<String> {
        self.credentials.iter().map(|key| mask_key(key)).collect()
    }

    /// 全部密钥（按配置顺序）
    pub fn credentials(&self) -> &[String] {
        &self.credentials
    }

    /// 端点列表
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// 当前轮次剩余可取的密钥数量
    pub async fn remaining_in_cycle(&self) -> usize {
        self.key_stack.lock().await.len()
    }

    /// 密钥是否属于本池
    pub fn contains(&self, key: &str) -> bool {
        self.credentials.iter().any(|k| k == key)
    }

    // ========================================================================
    // 临时禁用
    // ========================================================================

    /// 临时禁用密钥
    ///
    /// 密钥立即从当前轮次移除，禁用期内不参与后续洗牌
    pub async fn suspend_credential(&self, key: &str, duration: Duration) -> Result<(), PoolError> {
        if !self.contains(key) {
            return Err(PoolError::UnknownCredential {
                key_preview: mask_key(key),
            });
        }

        let until = checked_deadline(Utc::now(), duration).unwrap_or_else(|| {
            tracing::warn!("禁用时长 {:?} 超出可表示范围，按最大时间处理", duration);
            DateTime::<Utc>::MAX_UTC
        });
        self.suspensions.suspend(key, until);

        self.key_stack.lock().await.retain(|k| k != key);

        tracing::warn!("{} → 暂时禁用 {:?}", mask_key(key), duration);
        Ok(())
    }

    /// 按默认时长临时禁用密钥
    pub async fn suspend_credential_default(&self, key: &str) -> Result<(), PoolError> {
        self.suspend_credential(key, self.blacklist_duration).await
    }

    /// 提前解除禁用，返回密钥此前是否处于禁用表中
    ///
    /// 解除后的密钥从下一轮洗牌开始重新参与分配
    pub fn reinstate_credential(&self, key: &str) -> bool {
        let lifted = self.suspensions.lift(key);
        if lifted {
            tracing::info!("{} → 已解除临时禁用", mask_key(key));
        }
        lifted
    }

    /// 密钥当前是否处于禁用期
    pub fn is_suspended(&self, key: &str) -> bool {
        self.suspensions.is_active(key, Utc::now())
    }

    /// 当前处于禁用期的密钥数量
    pub fn suspended_count(&self) -> usize {
        self.suspensions.active_count(Utc::now())
    }

    /// 清理已过期的禁用条目
    pub fn sweep_expired(&self) -> usize {
        self.suspensions.sweep(Utc::now())
    }

    /// 生成新一轮的随机密钥栈（排除禁用期内的密钥）
    fn shuffled_credentials(&self) -> Vec<String> {
        let mut keys = self.suspensions.filter_available(&self.credentials, Utc::now());
        if keys.len() < self.credentials.len() {
            tracing::debug!(
                "重新洗牌: 可用 {}/{}（其余处于临时禁用）",
                keys.len(),
                self.credentials.len()
            );
        }
        keys.shuffle(&mut rand::thread_rng());
        keys
    }
}
