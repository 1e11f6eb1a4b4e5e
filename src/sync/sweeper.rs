//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了L1过期条目的后台清理任务。

use crate::backend::l1::L1Backend;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 启动L1后台清理任务
///
/// 每隔 `interval` 执行一次 [`L1Backend::sweep`]，直到 `token` 被取消。
/// 清理通过 L1 自身的分片锁完成，与前台读写互不阻塞整个表。
///
/// # 参数
///
/// * `l1` - L1缓存后端
/// * `interval` - 清理间隔
/// * `token` - 取消令牌，用于关闭任务
///
/// # 返回值
///
/// 返回任务句柄，关闭时可等待其结束
pub fn spawn_sweeper(
    l1: Arc<L1Backend>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting L1 sweeper with interval of {:?}", interval);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("L1 sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = l1.sweep();
                    if removed > 0 {
                        debug!("L1 sweep: removed {} expired entries", removed);
                    }
                }
            }
        }
    })
}
