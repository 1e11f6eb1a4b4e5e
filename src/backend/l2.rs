//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了L2缓存后端的接口以及基于Redis的实现。

use crate::config::L2Config;
use crate::error::{CacheError, Result};
use crate::metrics::ServerStats;
use crate::utils::pattern::glob_to_redis_match;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, FromRedisValue};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// SCAN 每批返回的建议数量
const SCAN_COUNT: usize = 1000;
/// 批量 DEL 时每条命令携带的最大键数
const DEL_CHUNK: usize = 500;

/// L2远程存储接口
///
/// 所有失败（网络、超时、协议）都以 [`CacheError`] 返回，由编排层决定如何降级。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 获取缓存值，不存在时返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 设置缓存值并指定过期时间（秒）
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()>;

    /// 删除缓存项，键不存在也视为成功
    async fn delete(&self, key: &str) -> Result<()>;

    /// 删除所有匹配模式的键
    ///
    /// 模式中只有 `*` 是通配符，匹配锚定整个键
    ///
    /// # 返回值
    ///
    /// 返回被匹配并删除的键
    async fn delete_by_pattern(&self, pattern: &str) -> Result<Vec<String>>;

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> Result<bool>;

    /// 批量获取，结果与输入顺序一致，不存在的键为 None
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// 批量设置 `(key, value, ttl)`
    async fn multi_set(&self, entries: Vec<(String, Vec<u8>, u64)>) -> Result<()>;

    /// 计数器增加 `delta`，返回增加后的值
    async fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// 获取服务端统计
    async fn server_stats(&self) -> Result<ServerStats>;

    /// 清空整个存储
    async fn flush_all(&self) -> Result<()>;
}

/// 基于Redis的L2缓存后端
///
/// 连接在第一次使用时建立，之后复用同一个 `ConnectionManager`
/// （其内部负责断线重连）。每条命令都受 `command_timeout_ms` 限制。
pub struct RedisBackend {
    client: Client,
    manager: OnceCell<ConnectionManager>,
    connection_timeout_ms: u64,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connected", &self.manager.initialized())
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish()
    }
}

impl RedisBackend {
    /// 创建新的Redis后端
    ///
    /// 只解析连接字符串，不发起网络连接
    ///
    /// # 参数
    ///
    /// * `config` - L2缓存配置
    pub fn new(config: &L2Config) -> Result<Self> {
        let client = Client::open(config.connection_string.expose_secret())?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
            connection_timeout_ms: config.connection_timeout_ms,
            command_timeout_ms: config.command_timeout_ms,
        })
    }

    /// 获取命令超时时间（毫秒）
    pub fn command_timeout_ms(&self) -> u64 {
        self.command_timeout_ms
    }

    /// 是否已经建立过连接
    pub fn is_connected(&self) -> bool {
        self.manager.initialized()
    }

    /// 获取（必要时建立）连接
    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                debug!("Establishing Redis connection");
                match timeout(
                    Duration::from_millis(self.connection_timeout_ms),
                    self.client.get_connection_manager(),
                )
                .await
                {
                    Ok(res) => res.map_err(CacheError::from),
                    Err(_) => Err(CacheError::Timeout(format!(
                        "Connection timed out after {}ms",
                        self.connection_timeout_ms
                    ))),
                }
            })
            .await?;
        Ok(manager.clone())
    }

    async fn query<T: FromRedisValue + Send>(&self, op: &str, cmd: &redis::Cmd) -> Result<T> {
        let mut conn = self.connection().await?;
        let result = timeout(
            Duration::from_millis(self.command_timeout_ms),
            cmd.query_async::<T>(&mut conn),
        )
        .await;
        match result {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout(format!(
                "{} timed out after {}ms",
                op, self.command_timeout_ms
            ))),
        }
    }

    async fn query_pipe<T: FromRedisValue + Send>(
        &self,
        op: &str,
        pipe: &redis::Pipeline,
    ) -> Result<T> {
        let mut conn = self.connection().await?;
        let result = timeout(
            Duration::from_millis(self.command_timeout_ms),
            pipe.query_async::<T>(&mut conn),
        )
        .await;
        match result {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout(format!(
                "{} timed out after {}ms",
                op, self.command_timeout_ms
            ))),
        }
    }

    /// 检查连接是否正常
    #[instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<()> {
        let response: String = self.query("PING", &redis::cmd("PING")).await?;
        debug!("Redis PING response: {}", response);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RedisBackend {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query("GET", &cmd).await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: u64) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl);
        self.query("SET", &cmd).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let _: i64 = self.query("DEL", &cmd).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let match_arg = glob_to_redis_match(pattern);
        let mut matched = Vec::new();
        let mut cursor = 0u64;
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(&match_arg)
                .arg("COUNT")
                .arg(SCAN_COUNT);
            let (next_cursor, keys): (u64, Vec<String>) = self.query("SCAN", &cmd).await?;
            matched.extend(keys);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // SCAN 可能重复返回同一个键
        matched.sort_unstable();
        matched.dedup();

        for chunk in matched.chunks(DEL_CHUNK) {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(chunk);
            let _: i64 = self.query("DEL", &cmd).await?;
        }
        debug!("L2 delete_by_pattern: pattern={}, matched={}", pattern, matched.len());
        Ok(matched)
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        self.query("EXISTS", &cmd).await
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("MGET");
        cmd.arg(keys);
        self.query("MGET", &cmd).await
    }

    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn multi_set(&self, entries: Vec<(String, Vec<u8>, u64)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for (key, value, ttl) in entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl)
                .ignore();
        }
        self.query_pipe("MSET pipeline", &pipe).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let mut cmd = redis::cmd("INCRBY");
        cmd.arg(key).arg(delta);
        self.query("INCRBY", &cmd).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn server_stats(&self) -> Result<ServerStats> {
        let mut stats_cmd = redis::cmd("INFO");
        stats_cmd.arg("stats");
        let stats_info: redis::InfoDict = self.query("INFO stats", &stats_cmd).await?;

        let mut clients_cmd = redis::cmd("INFO");
        clients_cmd.arg("clients");
        let clients_info: redis::InfoDict = self.query("INFO clients", &clients_cmd).await?;

        let key_count: u64 = self.query("DBSIZE", &redis::cmd("DBSIZE")).await?;

        Ok(ServerStats {
            command_count: stats_info
                .get::<u64>("total_commands_processed")
                .unwrap_or(0),
            connection_count: clients_info.get::<u64>("connected_clients").unwrap_or(0),
            key_count,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn flush_all(&self) -> Result<()> {
        self.query("FLUSHDB", &redis::cmd("FLUSHDB")).await
    }
}
