//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的统计收集功能。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// L1统计收集器
///
/// 计数器均为原子变量，可在并发的读写与清理之间共享
#[derive(Debug, Default)]
pub struct L1Stats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl L1Stats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    /// 所有计数器归零，仅由 flush-all 调用
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
    }

    /// 获取当前计数器快照
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
        )
    }
}

/// L1统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// hits / (hits + misses)，无访问时为0
    pub hit_rate: f64,
}

impl StatsSnapshot {
    pub fn new(hits: u64, misses: u64, sets: u64, deletes: u64) -> Self {
        Self {
            hits,
            misses,
            sets,
            deletes,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

/// 计算命中率
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// L2服务端统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    /// 服务端已处理的命令总数
    pub command_count: u64,
    /// 当前连接数
    pub connection_count: u64,
    /// 当前键数量
    pub key_count: u64,
}

/// 合并后的缓存统计报告
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    /// L1计数器与命中率
    pub l1: StatsSnapshot,
    /// L1当前持有的条目数（可能包含尚未清理的过期条目）
    pub l1_entries: usize,
    /// 被降级处理的L2调用失败次数
    pub l2_errors: u64,
    /// L2服务端统计，L2不可达时为 None
    pub l2: Option<ServerStats>,
    pub generated_at: DateTime<Utc>,
}

impl CacheReport {
    /// 将报告格式化为 Prometheus 文本格式
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("cache_l1_hits_total {}\n", self.l1.hits));
        output.push_str(&format!("cache_l1_misses_total {}\n", self.l1.misses));
        output.push_str(&format!("cache_l1_sets_total {}\n", self.l1.sets));
        output.push_str(&format!("cache_l1_deletes_total {}\n", self.l1.deletes));
        output.push_str(&format!("cache_l1_hit_rate {}\n", self.l1.hit_rate));
        output.push_str(&format!("cache_l1_entries {}\n", self.l1_entries));
        output.push_str(&format!("cache_l2_errors_total {}\n", self.l2_errors));
        if let Some(l2) = &self.l2 {
            output.push_str(&format!("cache_l2_commands_total {}\n", l2.command_count));
            output.push_str(&format!("cache_l2_connections {}\n", l2.connection_count));
            output.push_str(&format!("cache_l2_keys {}\n", l2.key_count));
        }
        output
    }
}
