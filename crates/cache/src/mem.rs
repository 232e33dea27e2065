use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use suzu_core::cache::error::CacheError;
use suzu_core::cache::port::Cache;
use suzu_core::common::time::{RealTimeProvider, TimeProvider};

// 单个缓存条目
struct Entry {
    value: Vec<u8>,
    // 过期时刻，None 表示永不过期
    expires_at: Option<DateTime<Utc>>,
}

/// # Summary
/// 基于 DashMap 的内存缓存实现，支持按键 TTL。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，保证多线程安全。
/// - 过期判定使用注入的 `TimeProvider`，过期条目在读取时惰性删除。
/// - 不提供容量限制，数据由业务逻辑管理。
pub struct MemCache {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, Entry>,
    clock: Arc<dyn TimeProvider>,
}

impl MemCache {
    /// # Summary
    /// 创建一个使用系统时钟的 MemCache 实例。
    pub fn new() -> Self {
        Self::with_clock(Arc::new(RealTimeProvider))
    }

    /// # Summary
    /// 使用指定时钟创建 MemCache，测试中可注入虚拟时钟。
    ///
    /// # Arguments
    /// * `clock` - 过期判定所用的时间源。
    pub fn with_clock(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            storage: DashMap::new(),
            clock,
        }
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// 设置原始字节数据。
    ///
    /// # Logic
    /// 1. 将 TTL 换算为绝对过期时刻。
    /// 2. 与 Value 一并插入哈希表，若存在同名 Key 则覆盖。
    ///
    /// # Returns
    /// * TTL 超出可表示范围时返回 `CacheError::Storage`。
    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let delta = TimeDelta::from_std(ttl)
                    .map_err(|e| CacheError::Storage(format!("invalid ttl: {e}")))?;
                let at = self.clock.now().checked_add_signed(delta).ok_or_else(|| {
                    CacheError::Storage(format!("ttl out of range: {}s", ttl.as_secs()))
                })?;
                Some(at)
            }
            None => None,
        };
        self.storage
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Logic
    /// 1. 检索 Key 对应的条目。
    /// 2. 已过期则移除并返回 None，否则克隆数据返回。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        match self.storage.get(key) {
            None => return Ok(None),
            Some(entry) => match entry.expires_at {
                Some(at) if at <= now => {}
                _ => return Ok(Some(entry.value.clone())),
            },
        }
        // 读锁已释放，条目可能已被并发覆盖，仅删除仍过期的值
        self.storage
            .remove_if(key, |_, e| e.expires_at.is_some_and(|at| at <= now));
        Ok(None)
    }

    /// 删除指定键，无论键是否存在均返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }
}
