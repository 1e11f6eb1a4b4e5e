//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

/// 双层缓存配置
///
/// 所有字段均有默认值，TOML 中可只写需要覆盖的部分
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// `set` 未指定TTL时使用的默认过期时间（秒）
    pub default_ttl: u64,
    /// L1条目的TTL上限（秒），与请求的整体TTL无关
    pub l1_ttl: u64,
    /// L1条目数阈值，超过后触发过期清理
    pub l1_max_entries: usize,
    /// 后台过期清理间隔（秒）
    pub sweep_interval_secs: u64,
    /// 是否对 `get_or_set` 的并发未命中做单飞去重
    pub single_flight: bool,
    /// 是否压缩序列化后的值
    pub compression: bool,
    /// L2缓存配置
    pub l2: L2Config,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            l1_ttl: 60,
            l1_max_entries: 1000,
            sweep_interval_secs: 60,
            single_flight: false,
            compression: false,
            l2: L2Config::default(),
        }
    }
}

/// L2缓存配置
///
/// 定义Redis连接的相关配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct L2Config {
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for L2Config {
    fn default() -> Self {
        Self {
            connection_string: SecretString::new("redis://127.0.0.1:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
        }
    }
}

impl CacheConfig {
    /// 从TOML字符串加载并验证配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CacheConfig =
            toml::from_str(content).map_err(|e| CacheError::ConfigError(e.to_string()))?;
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }

    /// 从TOML文件加载并验证配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查所有TTL、阈值与超时是否在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.default_ttl == 0 {
            return Err("default_ttl cannot be zero".to_string());
        }

        if self.default_ttl > 86400 * 30 {
            return Err("default_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        if self.l1_ttl == 0 {
            return Err("l1_ttl cannot be zero".to_string());
        }

        if self.l1_ttl > 86400 * 30 {
            return Err("l1_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        if self.l1_max_entries == 0 {
            return Err("l1_max_entries cannot be zero".to_string());
        }

        if self.l1_max_entries > 10_000_000 {
            return Err("l1_max_entries cannot exceed 10,000,000".to_string());
        }

        if self.sweep_interval_secs == 0 || self.sweep_interval_secs > 3600 {
            return Err("sweep_interval_secs must be between 1 and 3600 seconds".to_string());
        }

        let timeout = self.l2.connection_timeout_ms;
        if !(100..=30000).contains(&timeout) {
            return Err("l2 connection_timeout_ms must be between 100 and 30000 ms".to_string());
        }

        let timeout = self.l2.command_timeout_ms;
        if !(100..=60000).contains(&timeout) {
            return Err("l2 command_timeout_ms must be between 100 and 60000 ms".to_string());
        }

        Ok(())
    }
}
