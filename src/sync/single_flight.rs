//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了按键去重的单飞锁，用于防止缓存击穿时的重复回源。

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 单飞锁表
///
/// 同一个键在同一时刻最多只有一个持有者；其余调用者排队等待，
/// 拿到锁后应先重新读取缓存，再决定是否回源。
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

/// 单飞锁守卫
///
/// 释放时如果已没有其他调用者持有或等待这把锁，则从锁表中移除。
/// 仍有等待者时锁保留在表中，新来的调用者会继续排在同一把锁后面。
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    lock: Arc<Mutex<()>>,
    waited: bool,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FlightGuard<'_> {
    /// 是否曾等待其他持有者释放
    ///
    /// 为 true 时说明前一个持有者可能已经写入了缓存，应先重新读取
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某个键的单飞锁
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let (guard, waited) = match lock.clone().try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => (lock.clone().lock_owned().await, true),
        };
        FlightGuard {
            owner: self,
            key: key.to_string(),
            lock,
            waited,
            guard: Some(guard),
        }
    }

    /// 当前正在进行的键数量
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // 先释放互斥锁，之后剩下的引用只有锁表和本守卫
        drop(self.guard.take());
        self.owner.in_flight.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}
