//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! Redis后端集成测试，需要可用的Redis（可通过 REDIS_URL 指定）

use crate::common::{is_redis_available, redis_url, setup_logging, unique_prefix};
use duocache::config::{CacheConfig, L2Config};
use duocache::{RedisBackend, RemoteStore, TwoLevelCache};
use serial_test::serial;

#[path = "../common/mod.rs"]
mod common;

fn backend() -> RedisBackend {
    let config = L2Config {
        connection_string: redis_url().into(),
        connection_timeout_ms: 1000,
        command_timeout_ms: 1000,
    };
    RedisBackend::new(&config).expect("无效的Redis地址")
}

/// 测试基本读写与TTL
#[tokio::test]
#[serial]
async fn test_redis_basic_operations() {
    if !is_redis_available().await {
        println!("跳过test_redis_basic_operations：Redis不可用");
        return;
    }
    setup_logging();
    let l2 = backend();
    let key = format!("{}:basic", unique_prefix("redis"));

    assert_eq!(l2.get(&key).await.unwrap(), None);
    l2.set_with_ttl(&key, b"hello".to_vec(), 60).await.unwrap();
    assert!(l2.is_connected());
    assert_eq!(l2.get(&key).await.unwrap(), Some(b"hello".to_vec()));
    assert!(l2.exists(&key).await.unwrap());

    l2.delete(&key).await.unwrap();
    l2.delete(&key).await.unwrap();
    assert!(!l2.exists(&key).await.unwrap());
}

/// 测试按模式删除时glob元字符按字面处理
#[tokio::test]
#[serial]
async fn test_redis_pattern_delete_is_literal() {
    if !is_redis_available().await {
        println!("跳过test_redis_pattern_delete_is_literal：Redis不可用");
        return;
    }
    let l2 = backend();
    let prefix = unique_prefix("pattern");
    let bracket = format!("{}:a[1]", prefix);
    let question = format!("{}:a?2", prefix);
    let plain = format!("{}:ab", prefix);
    for key in [&bracket, &question, &plain] {
        l2.set_with_ttl(key, b"1".to_vec(), 60).await.unwrap();
    }

    let removed = l2
        .delete_by_pattern(&format!("{}:a[*", prefix))
        .await
        .unwrap();
    assert_eq!(removed, vec![bracket.clone()]);
    assert!(l2.exists(&question).await.unwrap());

    let mut removed = l2
        .delete_by_pattern(&format!("{}:*", prefix))
        .await
        .unwrap();
    removed.sort();
    assert_eq!(removed.len(), 2);
    assert!(!l2.exists(&plain).await.unwrap());
}

/// 测试批量操作、计数器与服务端统计
#[tokio::test]
#[serial]
async fn test_redis_batch_counter_and_stats() {
    if !is_redis_available().await {
        println!("跳过test_redis_batch_counter_and_stats：Redis不可用");
        return;
    }
    let l2 = backend();
    let prefix = unique_prefix("batch");
    let keys: Vec<String> = (0..3).map(|i| format!("{}:{}", prefix, i)).collect();

    l2.multi_set(vec![
        (keys[0].clone(), b"x".to_vec(), 60),
        (keys[2].clone(), b"z".to_vec(), 60),
    ])
    .await
    .unwrap();
    assert_eq!(
        l2.multi_get(&keys).await.unwrap(),
        vec![Some(b"x".to_vec()), None, Some(b"z".to_vec())]
    );
    assert!(l2.multi_get(&[]).await.unwrap().is_empty());

    let counter = format!("{}:counter", prefix);
    assert_eq!(l2.increment(&counter, 5).await.unwrap(), 5);
    assert_eq!(l2.increment(&counter, -2).await.unwrap(), 3);
    assert!(l2.increment(&keys[0], 1).await.is_err());

    let stats = l2.server_stats().await.unwrap();
    assert!(stats.command_count > 0);
    assert!(stats.connection_count >= 1);
    assert!(stats.key_count >= 3);

    l2.delete_by_pattern(&format!("{}:*", prefix)).await.unwrap();
}

/// 测试基于Redis的双层缓存
#[tokio::test]
#[serial]
async fn test_two_level_cache_over_redis() {
    if !is_redis_available().await {
        println!("跳过test_two_level_cache_over_redis：Redis不可用");
        return;
    }
    let mut config = CacheConfig::default();
    config.l2.connection_string = redis_url().into();
    let cache = TwoLevelCache::connect(config).await.unwrap();
    let key = format!("{}:value", unique_prefix("two_level"));

    assert!(cache.set(&key, &vec![1, 2, 3], Some(60)).await);
    cache.l1().clear();
    assert_eq!(cache.get::<Vec<i32>>(&key).await, Some(vec![1, 2, 3]));
    assert!(cache.exists(&key).await);
    assert!(cache.del(&key).await);
    assert_eq!(cache.get::<Vec<i32>>(&key).await, None);

    let report = cache.get_stats().await;
    assert!(report.l2.is_some());
    assert_eq!(report.l2_errors, 0);

    cache.shutdown().await;
}
