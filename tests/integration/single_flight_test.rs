//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! get_or_set 并发回源测试

use crate::common::setup_cache;
use duocache::config::CacheConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[path = "../common/mod.rs"]
mod common;

const CALLERS: usize = 8;

async fn run_concurrent_loads(single_flight: bool) -> (usize, Vec<String>) {
    let config = CacheConfig {
        single_flight,
        ..Default::default()
    };
    let (cache, _store) = setup_cache(config).await;
    let cache = Arc::new(cache);
    let loads = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let cache = cache.clone();
        let loads = loads.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let loaded: Result<String, String> = cache
                .get_or_set(
                    "report:daily",
                    move || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("expensive".to_string())
                    },
                    Some(60),
                )
                .await;
            loaded
        }));
    }

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }
    cache.shutdown().await;
    (loads.load(Ordering::SeqCst), values)
}

/// 测试启用单飞后并发未命中只回源一次
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_collapses_loads() {
    let (loads, values) = run_concurrent_loads(true).await;
    assert_eq!(loads, 1);
    assert!(values.iter().all(|v| v == "expensive"));
}

/// 测试未启用单飞时每个并发未命中各自回源
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_without_single_flight_loads_race() {
    let (loads, values) = run_concurrent_loads(false).await;
    assert!(loads > 1);
    assert_eq!(values.len(), CALLERS);
}

/// 测试加载失败时错误原样返回且不缓存任何内容
#[tokio::test]
async fn test_loader_error_is_not_cached() {
    let config = CacheConfig {
        single_flight: true,
        ..Default::default()
    };
    let (cache, store) = setup_cache(config).await;

    let result: Result<String, String> = cache
        .get_or_set("k", || async { Err("database down".to_string()) }, None)
        .await;
    assert_eq!(result.unwrap_err(), "database down");
    assert_eq!(store.set_calls(), 0);
    assert_eq!(cache.get::<String>("k").await, None);

    let retry: Result<String, String> = cache
        .get_or_set("k", || async { Ok("fresh".to_string()) }, None)
        .await;
    assert_eq!(retry.unwrap(), "fresh");

    cache.shutdown().await;
}
