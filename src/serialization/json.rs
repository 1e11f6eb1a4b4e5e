//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 基于serde_json；启用压缩时对JSON字节做gzip压缩。
/// 同一个L2上的所有实例必须使用相同的压缩设置。
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    compress: bool,
}

impl JsonSerializer {
    /// 创建新的JSON序列化器
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的JSON序列化器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

        if !self.compress {
            return Ok(json_bytes);
        }

        #[cfg(feature = "flate2")]
        {
            use flate2::write::GzEncoder;
            use flate2::Compression;
            use std::io::Write;

            let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
            encoder
                .write_all(&json_bytes)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CacheError::Serialization(e.to_string()))
        }

        #[cfg(not(feature = "flate2"))]
        {
            Ok(json_bytes)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        if !self.compress {
            return serde_json::from_slice(data)
                .map_err(|e| CacheError::Serialization(e.to_string()));
        }

        #[cfg(feature = "flate2")]
        {
            use flate2::read::GzDecoder;
            use std::io::Read;

            let mut decoded = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut decoded)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            serde_json::from_slice(&decoded).map_err(|e| CacheError::Serialization(e.to_string()))
        }

        #[cfg(not(feature = "flate2"))]
        {
            serde_json::from_slice(data).map_err(|e| CacheError::Serialization(e.to_string()))
        }
    }
}
