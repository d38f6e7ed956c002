//! 密钥临时禁用表
//!
//! 记录被暂时禁用的密钥及其恢复时间，重新洗牌时排除仍在禁用期内的密钥；
//! 后台任务定期清理已过期的条目

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use super::KeyPool;

/// 计算禁用截止时间
///
/// 时长超出 chrono 可表示的范围时返回 None
pub(crate) fn checked_deadline(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(duration).ok()?;
    now.checked_add_signed(delta)
}

/// 禁用表：密钥 -> 恢复时间
#[derive(Debug, Default)]
pub(crate) struct Suspensions {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Suspensions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 禁用密钥直到指定时间（重复禁用时以新的恢复时间为准）
    pub(crate) fn suspend(&self, key: &str, until: DateTime<Utc>) {
        self.entries.lock().insert(key.to_string(), until);
    }

    /// 解除禁用，返回密钥此前是否处于禁用表中
    pub(crate) fn lift(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// 密钥在给定时刻是否仍处于禁用期
    pub(crate) fn is_active(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|until| *until > now)
    }

    /// 仍处于禁用期的密钥数量
    pub(crate) fn active_count(&self, now: DateTime<Utc>) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|until| **until > now)
            .count()
    }

    /// 从候选密钥中排除仍处于禁用期的密钥
    pub(crate) fn filter_available(&self, keys: &[String], now: DateTime<Utc>) -> Vec<String> {
        let entries = self.entries.lock();
        if entries.is_empty() {
            return keys.to_vec();
        }
        keys.iter()
            .filter(|key| !entries.get(*key).is_some_and(|until| *until > now))
            .cloned()
            .collect()
    }

    /// 禁用表中的条目数（含已过期但尚未清理的）
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// 清理过期条目，返回清理数量
    pub(crate) fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, until| *until > now);
        before - entries.len()
    }
}

/// 启动后台禁用表清理任务
///
/// 按固定周期清理已过期的临时禁用条目
pub fn start_blacklist_sweeper(
    pool: Arc<KeyPool>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    // tokio 的 interval 不接受零周期
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.tick().await; // 跳过第一次立即触发

        loop {
            ticker.tick().await;
            let removed = pool.sweep_expired();
            if removed > 0 {
                tracing::info!("已恢复 {} 个临时禁用的密钥", removed);
            }
        }
    })
}
