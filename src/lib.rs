//! duocache - 双层缓存库
//!
//! 进程内L1缓存前置于共享的L2（Redis）存储，
//! 提供读穿透、写穿透、L2故障降级、模式失效与统计汇总。
//!
//! ```no_run
//! use duocache::{CacheConfig, TwoLevelCache};
//!
//! # async fn demo() -> duocache::error::Result<()> {
//! let cache = TwoLevelCache::connect(CacheConfig::default()).await?;
//! cache.set("session:42", &serde_json::json!({ "uid": 42 }), Some(120)).await;
//! let session: Option<serde_json::Value> = cache.get("session:42").await;
//! cache.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod serialization;
pub mod sync;
pub mod telemetry;
pub mod utils;

pub use backend::{L1Backend, MemoryStore, RedisBackend, RemoteStore};
pub use client::TwoLevelCache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use metrics::{CacheReport, ServerStats, StatsSnapshot};

/// duocache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
