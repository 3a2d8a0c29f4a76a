//! 托管后端客户端句柄缓存
//!
//! 按账户标签缓存后端解析出的账户信息，带 TTL 的显式缓存对象，
//! 时钟注入便于测试。后台清扫只是顾问性质的内存管理，命中与否
//! 不影响正确性——余额与钱包目录数据从不缓存。

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{sync::RwLock, time::interval};

/// 可注入时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 系统时钟
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 缓存的后端账户句柄
#[derive(Debug, Clone)]
pub struct AccountHandle {
    pub address: String,
    pub account_ref: String,
}

struct CachedHandle {
    handle: AccountHandle,
    inserted_at: Instant,
}

/// 句柄缓存：TTL 默认 30 分钟，定期清扫
pub struct ClientHandleCache {
    entries: RwLock<HashMap<String, CachedHandle>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl ClientHandleCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }

    #[cfg(test)]
    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }

    pub async fn get(&self, label: &str) -> Option<AccountHandle> {
        let entries = self.entries.read().await;
        let cached = entries.get(label)?;
        if self.clock.now().duration_since(cached.inserted_at) >= self.ttl {
            return None;
        }
        Some(cached.handle.clone())
    }

    pub async fn put(&self, label: &str, handle: AccountHandle) {
        let mut entries = self.entries.write().await;
        entries.insert(
            label.to_string(),
            CachedHandle {
                handle,
                inserted_at: self.clock.now(),
            },
        );
    }

    /// 清除过期条目，返回清除数量
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, c| now.duration_since(c.inserted_at) < self.ttl);
        before - entries.len()
    }

    /// 后台清扫任务（固定间隔）
    pub async fn start_eviction_sweep(self: Arc<Self>) {
        let mut ticker = interval(self.sweep_interval);
        loop {
            ticker.tick().await;
            let evicted = self.evict_expired().await;
            if evicted > 0 {
                tracing::debug!(evicted = evicted, "client handle cache sweep");
            }
        }
    }
}
