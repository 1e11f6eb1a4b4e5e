//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 键匹配模式工具
//!
//! 模式中只有 `*` 是通配符，匹配任意长度（包括零长度）的任意字符，
//! 其余字符（包括 `.`、`?`、`[`、`\` 等）一律按字面匹配，且匹配锚定整个键。
//! L1 使用 [`glob_to_regex`]，L2 使用 [`glob_to_redis_match`]，两者语义一致。

use crate::error::{CacheError, Result};
use regex::Regex;

/// 将键模式转换为锚定的正则表达式
///
/// `user:*` 转换为 `^user:.*$`，其它正则元字符均被转义
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?s)^{}$", body)).map_err(|e| CacheError::InvalidPattern(e.to_string()))
}

/// 将键模式转换为 Redis `SCAN MATCH` 参数
///
/// Redis glob 还会解释 `?`、`[`、`]` 与 `\`，这里将它们转义为字面字符
pub fn glob_to_redis_match(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
