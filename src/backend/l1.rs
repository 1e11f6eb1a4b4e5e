//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了L1缓存后端的实现，基于内存的高速缓存。

use super::deadline_after;
use crate::metrics::L1Stats;
use ahash::RandomState;
use dashmap::DashMap;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// L1缓存条目
#[derive(Debug, Clone)]
struct L1Entry {
    value: Vec<u8>,
    /// None 表示截止时间超出可表示范围，永不过期
    expires_at: Option<Instant>,
}

impl L1Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// L1缓存后端实现
///
/// 基于分片并发哈希表的进程内缓存。过期在读取时惰性执行，
/// 也由 [`sweep`](L1Backend::sweep) 主动执行；两者与前台读写使用同一组分片锁。
///
/// `max_entries` 只是清理触发阈值：超过后执行一次过期清理，但不会拒绝写入。
#[derive(Debug)]
pub struct L1Backend {
    entries: DashMap<String, L1Entry, RandomState>,
    max_entries: usize,
    stats: L1Stats,
}

impl L1Backend {
    /// 创建新的L1缓存后端实例
    ///
    /// # 参数
    ///
    /// * `max_entries` - 触发过期清理的条目数阈值
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            max_entries,
            stats: L1Stats::default(),
        }
    }

    /// 获取缓存值
    ///
    /// 仅当条目存在且未过期时返回；过期条目会被顺带移除。
    /// 命中与未命中都会计入统计。
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    ///
    /// # 返回值
    ///
    /// 返回缓存值，如果不存在或已过期则返回None
    #[instrument(skip(self), level = "debug")]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key)
            .and_then(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        match found {
            Some(value) => {
                self.stats.record_hit();
                debug!("L1 get: key={}, found=true", key);
                Some(value)
            }
            None => {
                // 读锁已释放，这里只移除确实已过期的条目，避免误删并发写入的新值
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.is_expired(now))
                    .is_some()
                {
                    debug!("L1 get: key={}, expired=true, removed", key);
                }
                self.stats.record_miss();
                debug!("L1 get: key={}, found=false", key);
                None
            }
        }
    }

    /// 设置缓存值
    ///
    /// 插入或整体替换条目，过期时间为 `now + ttl`。
    /// 插入后条目数超过阈值时执行一次过期清理。
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `value` - 缓存值（字节数组）
    /// * `ttl` - 过期时间（秒）
    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    pub fn set(&self, key: &str, value: Vec<u8>, ttl: u64) {
        let expires_at = deadline_after(Instant::now(), ttl);
        self.entries
            .insert(key.to_string(), L1Entry { value, expires_at });
        self.stats.record_set();

        if self.entries.len() > self.max_entries {
            let removed = self.sweep();
            debug!(
                "L1 set: entry count exceeded {}, swept {} expired entries",
                self.max_entries, removed
            );
        }
    }

    /// 删除缓存项
    ///
    /// # 返回值
    ///
    /// 条目存在并被删除时返回 true
    #[instrument(skip(self), level = "debug")]
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_deletes(1);
        }
        debug!("L1 delete: key={}, removed={}", key, removed);
        removed
    }

    /// 删除所有匹配的键
    ///
    /// 匹配的过期条目同样会被移除，但只统计未过期的条目
    ///
    /// # 返回值
    ///
    /// 返回被删除的未过期条目数
    #[instrument(skip(self, pattern), level = "debug", fields(pattern = pattern.as_str()))]
    pub fn delete_matching(&self, pattern: &Regex) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if !pattern.is_match(key) {
                return true;
            }
            if !entry.is_expired(now) {
                removed += 1;
            }
            false
        });
        self.stats.record_deletes(removed as u64);
        debug!("L1 delete_matching: removed={}", removed);
        removed
    }

    /// 清理所有已过期的条目
    ///
    /// # 返回值
    ///
    /// 返回被清理的条目数
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// 清空 L1 缓存
    ///
    /// 不会重置统计，统计由调用方按需重置
    pub fn clear(&self) {
        debug!("L1 clear: 清空所有缓存项");
        self.entries.clear();
    }

    /// 当前持有的条目数（含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &L1Stats {
        &self.stats
    }
}
