//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! L2故障时的降级行为测试

use crate::common::setup_cache;
use duocache::config::CacheConfig;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

/// 测试L2不可用时写入失败但L1副本仍可读取到其过期时间
#[tokio::test(start_paused = true)]
async fn test_set_during_outage_keeps_l1_copy() {
    let config = CacheConfig {
        l1_ttl: 30,
        ..Default::default()
    };
    let (cache, store) = setup_cache(config).await;
    store.set_failing(true);

    assert!(!cache.set("k", &"v", Some(300)).await);
    assert_eq!(cache.get::<String>("k").await, Some("v".to_string()));
    assert_eq!(store.get_calls(), 0);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(cache.get::<String>("k").await, None);
    assert_eq!(store.get_calls(), 1);

    cache.shutdown().await;
}

/// 测试L2不可用时各操作都不返回错误
#[tokio::test]
async fn test_operations_degrade_instead_of_failing() {
    let (cache, store) = setup_cache(CacheConfig::default()).await;
    assert!(cache.set("present", &1, None).await);
    store.set_failing(true);

    assert_eq!(cache.get::<i32>("remote-only").await, None);
    assert!(!cache.exists("present").await);
    assert_eq!(cache.incr("counter", 1).await, None);

    let keys = vec!["a".to_string(), "b".to_string()];
    assert_eq!(cache.mget::<i32>(&keys).await, vec![None, None]);
    assert!(!cache.mset(&[("a".to_string(), 1)], None).await);

    // 删除仍作用于L1，mset 失败时写入的 "a" 保留在L1
    assert!(!cache.del("present").await);
    assert_eq!(cache.l1().len(), 1);

    let report = cache.get_stats().await;
    assert!(report.l2.is_none());
    assert!(report.l2_errors >= 7);

    cache.shutdown().await;
}

/// 测试L2不可用时按模式删除只统计L1部分
#[tokio::test]
async fn test_del_pattern_counts_l1_only_during_outage() {
    let (cache, store) = setup_cache(CacheConfig::default()).await;
    assert!(cache.set("user:1", &1, None).await);
    assert!(cache.set("user:2", &2, None).await);
    store.set_failing(true);

    assert_eq!(cache.del_pattern("user:*").await, 2);

    // L2恢复后旧值仍在L2上
    store.set_failing(false);
    assert_eq!(cache.get::<i32>("user:1").await, Some(1));

    cache.shutdown().await;
}

/// 测试L2恢复后无需重建缓存即可继续工作
#[tokio::test]
async fn test_recovers_when_l2_returns() {
    let (cache, store) = setup_cache(CacheConfig::default()).await;
    store.set_failing(true);
    assert!(!cache.set("k", &1, None).await);
    assert!(!cache.flush_all().await);

    store.set_failing(false);
    assert!(cache.set("k", &2, None).await);
    assert!(cache.exists("k").await);
    assert!(cache.get_stats().await.l2.is_some());

    cache.shutdown().await;
}
