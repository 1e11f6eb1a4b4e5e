//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use async_trait::async_trait;
use duocache::config::CacheConfig;
use duocache::error::{CacheError, Result};
use duocache::{MemoryStore, RemoteStore, ServerStats, TwoLevelCache};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 可注入故障的L2存储
///
/// 包装 [`MemoryStore`]，`fail` 打开时所有操作都返回连接错误；
/// 同时记录每类操作的调用次数。
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail: AtomicBool,
    pub get_calls: AtomicUsize,
    pub set_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CacheError::L2Error("模拟连接失败".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.check()?;
        self.inner.delete_by_pattern(pattern).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.exists(key).await
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.check()?;
        self.inner.multi_get(keys).await
    }

    async fn multi_set(&self, entries: Vec<(String, Vec<u8>, u64)>) -> Result<()> {
        self.check()?;
        self.inner.multi_set(entries).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.check()?;
        self.inner.increment(key, delta).await
    }

    async fn server_stats(&self) -> Result<ServerStats> {
        self.check()?;
        self.inner.server_stats().await
    }

    async fn flush_all(&self) -> Result<()> {
        self.check()?;
        self.inner.flush_all().await
    }
}

/// 基于 [`FaultyStore`] 创建双层缓存
pub async fn setup_cache(config: CacheConfig) -> (TwoLevelCache, Arc<FaultyStore>) {
    setup_logging();
    let store = Arc::new(FaultyStore::new());
    let cache = TwoLevelCache::init(config, store.clone())
        .await
        .expect("缓存初始化失败");
    (cache, store)
}

/// 生成唯一的键前缀，避免共享Redis上的测试互相干扰
pub fn unique_prefix(name: &str) -> String {
    format!("duocache_test:{}:{}", name, uuid::Uuid::new_v4().simple())
}

/// 测试用Redis地址，可通过 `REDIS_URL` 覆盖
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 检查Redis是否可用
pub async fn is_redis_available() -> bool {
    let client = match redis::Client::open(redis_url()) {
        Ok(client) => client,
        Err(_) => return false,
    };
    let connect = tokio::time::timeout(
        Duration::from_millis(500),
        client.get_multiplexed_async_connection(),
    )
    .await;
    let mut conn = match connect {
        Ok(Ok(conn)) => conn,
        _ => return false,
    };
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    pong.is_ok()
}
