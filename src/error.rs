//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的错误类型和处理机制。

use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 只有后端与配置层会返回这些错误；编排层（`TwoLevelCache`）
/// 会将它们转换为调用方可见的值、缺失或布尔结果。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// L2缓存操作失败
    #[error("L2 operation failed: {0}")]
    L2Error(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 键匹配模式无效
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    /// 是否为L2传输层故障（网络、超时、协议）
    ///
    /// 编排层据此决定是否降级为仅L1语义
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CacheError::L2Error(_) | CacheError::Timeout(_) | CacheError::RedisError(_)
        )
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有后端操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;
