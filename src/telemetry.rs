//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的日志与链路追踪初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 初始化 tracing 日志与 OpenTelemetry 追踪
///
/// 应在应用程序启动时调用一次；已有全局 subscriber 时静默跳过。
/// `RUST_LOG` 优先于 `default_filter`。
///
/// # 参数
///
/// * `service_name` - 服务名称，作为 tracer 名称
/// * `default_filter` - 未设置 `RUST_LOG` 时使用的过滤规则，例如 `"info"`
pub fn init_tracing(service_name: &str, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // 未配置导出器时 provider 不会发送任何数据，只为 span 提供 trace 上下文
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    let _ = tracing::subscriber::set_global_default(subscriber);
}
