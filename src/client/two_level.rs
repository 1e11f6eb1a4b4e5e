//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了双层缓存的编排实现，结合L1和L2缓存。
//!
//! 读取先查L1，未命中再查L2并回填L1；写入同时写两层。
//! L2的任何失败都不会以错误形式暴露给调用方：读路径降级为缺失，
//! 写/删路径以 `false` 报告。

use crate::backend::{l1::L1Backend, l2::RedisBackend, l2::RemoteStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::metrics::CacheReport;
use crate::serialization::{JsonSerializer, Serializer, SerializerEnum};
use crate::sync::{single_flight::SingleFlight, sweeper::spawn_sweeper};
use crate::utils::pattern::glob_to_regex;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// 双层缓存
///
/// 显式构造、显式关闭的缓存实例，通常以 `Arc<TwoLevelCache>` 在请求之间共享。
pub struct TwoLevelCache {
    /// 缓存配置
    config: CacheConfig,
    /// L1缓存后端
    l1: Arc<L1Backend>,
    /// L2远程存储
    l2: Arc<dyn RemoteStore>,
    /// 序列化器
    serializer: SerializerEnum,
    /// get_or_set 单飞锁，未启用时为 None
    flights: Option<SingleFlight>,
    /// 被降级处理的L2失败次数
    l2_errors: AtomicU64,
    /// 后台清理任务的取消令牌
    shutdown_token: CancellationToken,
    /// 后台清理任务句柄
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TwoLevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoLevelCache")
            .field("config", &self.config)
            .field("l1_entries", &self.l1.len())
            .finish()
    }
}

impl TwoLevelCache {
    /// 创建双层缓存并启动L1后台清理任务
    ///
    /// # 参数
    ///
    /// * `config` - 缓存配置
    /// * `l2` - L2远程存储
    ///
    /// # 返回值
    ///
    /// 配置无效时返回 `CacheError::ConfigError`
    #[instrument(skip(config, l2), level = "info", name = "init_two_level_cache")]
    pub async fn init(config: CacheConfig, l2: Arc<dyn RemoteStore>) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;

        let l1 = Arc::new(L1Backend::new(config.l1_max_entries));
        let serializer = if config.compression {
            SerializerEnum::Json(JsonSerializer::with_compression())
        } else {
            SerializerEnum::Json(JsonSerializer::new())
        };

        let shutdown_token = CancellationToken::new();
        let handle = spawn_sweeper(
            l1.clone(),
            Duration::from_secs(config.sweep_interval_secs),
            shutdown_token.clone(),
        );

        info!(
            "TwoLevelCache initialized: default_ttl={}s, l1_ttl={}s, l1_max_entries={}, single_flight={}",
            config.default_ttl, config.l1_ttl, config.l1_max_entries, config.single_flight
        );

        Ok(Self {
            flights: config.single_flight.then(SingleFlight::new),
            config,
            l1,
            l2,
            serializer,
            l2_errors: AtomicU64::new(0),
            shutdown_token,
            sweeper_handle: Mutex::new(Some(handle)),
        })
    }

    /// 使用Redis作为L2创建双层缓存
    ///
    /// Redis连接在第一次访问L2时才建立
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        let l2 = Arc::new(RedisBackend::new(&config.l2)?);
        Self::init(config, l2).await
    }

    /// 优雅关闭
    ///
    /// 停止后台清理任务并等待其退出，可重复调用
    #[instrument(skip(self), level = "info")]
    pub async fn shutdown(&self) {
        info!("正在关闭TwoLevelCache...");
        self.shutdown_token.cancel();
        let handle = self
            .sweeper_handle
            .lock()
            .ok()
            .and_then(|mut handle| handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("L1 sweeper terminated abnormally: {}", e);
            }
        }
        info!("TwoLevelCache已关闭");
    }

    /// 获取当前配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 获取L1缓存后端
    pub fn l1(&self) -> &L1Backend {
        &self.l1
    }

    /// 处理L2故障
    fn handle_l2_failure(&self, op: &str, key: &str, err: &CacheError) {
        self.l2_errors.fetch_add(1, Ordering::Relaxed);
        if err.is_transport() {
            warn!("L2 {} failed for key {}, degrading: {}", op, key, err);
        } else {
            error!("L2 {} returned an unexpected error for key {}: {}", op, key, err);
        }
    }

    /// 获取缓存值
    ///
    /// L1命中直接返回，不访问L2；L1未命中时读取L2，命中后以 `l1_ttl` 回填L1。
    /// L2失败或值无法反序列化时返回 None。
    #[instrument(skip(self), level = "debug")]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(bytes) = self.l1.get(key) {
            return match self.serializer.deserialize(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("L1 value for key {} does not match requested type: {}", key, e);
                    None
                }
            };
        }

        match self.l2.get(key).await {
            Ok(Some(bytes)) => match self.serializer.deserialize::<T>(&bytes) {
                Ok(value) => {
                    debug!("L2 hit for key: {}, backfilling L1", key);
                    self.l1.set(key, bytes, self.config.l1_ttl);
                    Some(value)
                }
                Err(e) => {
                    warn!("Malformed L2 value for key {}, treating as miss: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("L2 miss for key: {}", key);
                None
            }
            Err(e) => {
                self.handle_l2_failure("get", key, &e);
                None
            }
        }
    }

    /// 设置缓存值
    ///
    /// L1写入 `min(ttl, l1_ttl)`，L2写入完整的 `ttl`（默认 `default_ttl`）。
    /// 仅当L2写入成功时返回 true；L2失败时L1中的值保留到其L1过期时间。
    #[instrument(skip(self, value), level = "debug")]
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        if ttl == 0 {
            warn!("Rejecting set for key {} with zero TTL", key);
            return false;
        }

        let bytes = match self.serializer.serialize(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize value for key {}: {}", key, e);
                return false;
            }
        };

        self.l1.set(key, bytes.clone(), ttl.min(self.config.l1_ttl));

        match self.l2.set_with_ttl(key, bytes, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.handle_l2_failure("set", key, &e);
                false
            }
        }
    }

    /// 删除缓存项
    ///
    /// 两层都删除，键不存在视为成功；仅L2失败时返回 false
    #[instrument(skip(self), level = "debug")]
    pub async fn del(&self, key: &str) -> bool {
        self.l1.delete(key);
        match self.l2.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                self.handle_l2_failure("del", key, &e);
                false
            }
        }
    }

    /// 按模式删除
    ///
    /// L1按本地持有的键匹配，L2通过远程模式删除，两者互不协调。
    ///
    /// # 返回值
    ///
    /// 两层删除数量之和；L2失败时只包含L1部分
    #[instrument(skip(self), level = "debug")]
    pub async fn del_pattern(&self, pattern: &str) -> usize {
        let re = match glob_to_regex(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Invalid key pattern {}: {}", pattern, e);
                return 0;
            }
        };
        let local = self.l1.delete_matching(&re);

        let remote = match self.l2.delete_by_pattern(pattern).await {
            Ok(keys) => keys.len(),
            Err(e) => {
                self.handle_l2_failure("del_pattern", pattern, &e);
                0
            }
        };
        debug!(
            "del_pattern {}: removed {} from L1, {} from L2",
            pattern, local, remote
        );
        local + remote
    }

    /// 检查键是否存在
    ///
    /// 只询问L2；L2失败时返回 false
    #[instrument(skip(self), level = "debug")]
    pub async fn exists(&self, key: &str) -> bool {
        match self.l2.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                self.handle_l2_failure("exists", key, &e);
                false
            }
        }
    }

    /// 获取缓存值，未命中时调用 `loader` 生成并写入缓存
    ///
    /// `loader` 的错误原样返回，且不会缓存任何内容。
    /// 启用 `single_flight` 时，同一键的并发未命中只会调用一次 `loader`。
    #[instrument(skip(self, loader), level = "debug")]
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        loader: F,
        ttl: Option<u64>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let _flight = match &self.flights {
            Some(flights) => {
                let guard = flights.acquire(key).await;
                if guard.waited() {
                    if let Some(value) = self.get(key).await {
                        return Ok(value);
                    }
                }
                Some(guard)
            }
            None => None,
        };

        debug!("Cache miss for key {}, invoking loader", key);
        let value = loader().await?;
        if !self.set(key, &value, ttl).await {
            debug!("Loaded value for key {} is cached in L1 only", key);
        }
        Ok(value)
    }

    /// 批量获取
    ///
    /// 委托给L2批量读取，每个值独立反序列化，格式错误的值视为缺失
    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    pub async fn mget<T: DeserializeOwned>(&self, keys: &[String]) -> Vec<Option<T>> {
        match self.l2.multi_get(keys).await {
            Ok(values) => keys
                .iter()
                .zip(values)
                .map(|(key, bytes)| {
                    bytes.and_then(|bytes| match self.serializer.deserialize(&bytes) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!("Malformed L2 value for key {} in mget: {}", key, e);
                            None
                        }
                    })
                })
                .collect(),
            Err(e) => {
                self.handle_l2_failure("mget", &keys.join(","), &e);
                keys.iter().map(|_| None).collect()
            }
        }
    }

    /// 批量设置
    ///
    /// 逐项调用 [`set`](Self::set)，不是原子操作；全部成功时返回 true
    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    pub async fn mset<T: Serialize>(&self, entries: &[(String, T)], ttl: Option<u64>) -> bool {
        let results =
            futures::future::join_all(entries.iter().map(|(key, value)| self.set(key, value, ttl)))
                .await;
        results.into_iter().all(|ok| ok)
    }

    /// 计数器自增
    ///
    /// 只在L2上执行；同时丢弃L1中该键的副本，避免之后读到旧数值。
    /// L2失败时返回 None。
    #[instrument(skip(self), level = "debug")]
    pub async fn incr(&self, key: &str, delta: i64) -> Option<i64> {
        self.l1.delete(key);
        match self.l2.increment(key, delta).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.handle_l2_failure("incr", key, &e);
                None
            }
        }
    }

    /// 获取合并后的统计报告
    #[instrument(skip(self), level = "debug")]
    pub async fn get_stats(&self) -> CacheReport {
        let l2 = match self.l2.server_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                self.handle_l2_failure("server_stats", "-", &e);
                None
            }
        };
        CacheReport {
            l1: self.l1.stats().snapshot(),
            l1_entries: self.l1.len(),
            l2_errors: self.l2_errors.load(Ordering::Relaxed),
            l2,
            generated_at: chrono::Utc::now(),
        }
    }

    /// 清空所有缓存
    ///
    /// 清空L1、重置统计并清空L2；仅L2失败时返回 false
    #[instrument(skip(self), level = "info")]
    pub async fn flush_all(&self) -> bool {
        self.l1.clear();
        self.l1.stats().reset();
        self.l2_errors.store(0, Ordering::Relaxed);
        match self.l2.flush_all().await {
            Ok(()) => {
                info!("Flushed L1 and L2");
                true
            }
            Err(e) => {
                self.handle_l2_failure("flush_all", "*", &e);
                false
            }
        }
    }
}

impl Drop for TwoLevelCache {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
