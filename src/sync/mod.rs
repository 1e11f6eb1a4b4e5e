//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的并发与后台机制，包括单飞锁和L1过期清理。

pub mod single_flight;
pub mod sweeper;
