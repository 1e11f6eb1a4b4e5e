//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的L2存储实现，用于单进程部署、基准测试与测试。

use super::deadline_after;
use super::l2::RemoteStore;
use crate::error::{CacheError, Result};
use crate::metrics::ServerStats;
use crate::utils::pattern::glob_to_regex;
use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::instrument;

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// 进程内远程存储
///
/// 语义与Redis后端一致：独立的TTL、计数器以十进制字符串保存、
/// `increment` 保留原有过期时间。
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, StoredValue, RandomState>,
    commands: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn count_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    fn live_value(&self, key: &str, now: Instant) -> Option<Vec<u8>> {
        let value = self
            .data
            .get(key)
            .and_then(|v| v.is_live(now).then(|| v.data.clone()));
        if value.is_none() {
            self.data.remove_if(key, |_, v| !v.is_live(now));
        }
        value
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.count_command();
        Ok(self.live_value(key, Instant::now()))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()> {
        self.count_command();
        self.data.insert(
            key.to_string(),
            StoredValue {
                data: value,
                expires_at: deadline_after(Instant::now(), ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.count_command();
        self.data.remove(key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.count_command();
        let re = glob_to_regex(pattern)?;
        let now = Instant::now();
        let mut matched = Vec::new();
        self.data.retain(|key, value| {
            if !re.is_match(key) {
                return true;
            }
            if value.is_live(now) {
                matched.push(key.clone());
            }
            false
        });
        Ok(matched)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.count_command();
        Ok(self.live_value(key, Instant::now()).is_some())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.count_command();
        let now = Instant::now();
        Ok(keys.iter().map(|k| self.live_value(k, now)).collect())
    }

    async fn multi_set(&self, entries: Vec<(String, Vec<u8>, u64)>) -> Result<()> {
        self.count_command();
        let now = Instant::now();
        for (key, value, ttl) in entries {
            self.data.insert(
                key,
                StoredValue {
                    data: value,
                    expires_at: deadline_after(now, ttl),
                },
            );
        }
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.count_command();
        let now = Instant::now();
        let mut entry = self.data.entry(key.to_string()).or_insert(StoredValue {
            data: b"0".to_vec(),
            expires_at: None,
        });
        if !entry.is_live(now) {
            *entry = StoredValue {
                data: b"0".to_vec(),
                expires_at: None,
            };
        }
        let current: i64 = std::str::from_utf8(&entry.data)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                CacheError::L2Error("value is not an integer or out of range".to_string())
            })?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::L2Error("increment would overflow".to_string()))?;
        entry.data = next.to_string().into_bytes();
        Ok(next)
    }

    async fn server_stats(&self) -> Result<ServerStats> {
        self.count_command();
        let now = Instant::now();
        let key_count = self.data.iter().filter(|e| e.is_live(now)).count() as u64;
        Ok(ServerStats {
            command_count: self.commands.load(Ordering::Relaxed),
            connection_count: 1,
            key_count,
        })
    }

    async fn flush_all(&self) -> Result<()> {
        self.count_command();
        self.data.clear();
        Ok(())
    }
}
