//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的后端，包括L1本地缓存与L2远程存储。

pub mod l1;
pub mod l2;
pub mod memory;

pub use l1::L1Backend;
pub use l2::{RedisBackend, RemoteStore};
pub use memory::MemoryStore;

use std::time::Duration;
use tokio::time::Instant;

/// 计算 `now + ttl` 秒后的截止时间
///
/// 超出 `Instant` 可表示范围时返回 None，即视为永不过期
pub(crate) fn deadline_after(now: Instant, ttl: u64) -> Option<Instant> {
    now.checked_add(Duration::from_secs(ttl))
}
