//! 统一可观测性模块
//!
//! 提供日志初始化和 HTTP 请求追踪中间件。
//! 所有服务通过单一入口点配置日志，确保一致的格式和过滤规则。

use crate::config::ObservabilityConfig;
use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// 初始化 tracing 日志
///
/// 日志级别优先读取 RUST_LOG 环境变量，其次使用配置中的 log_level。
/// log_format 为 "json" 时输出结构化日志（生产环境），否则输出人类可读格式。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// HTTP 中间件
pub mod middleware {
    use std::time::Instant;

    use axum::{extract::Request, middleware::Next, response::Response};
    use tracing::{Instrument, info_span};

    /// HTTP 请求追踪中间件
    ///
    /// 为每个请求创建追踪 span 并记录状态码与延迟。
    pub async fn http_tracing(request: Request, next: Next) -> Response {
        let method = request.method().to_string();
        let uri = request.uri().path().to_string();

        let span = info_span!(
            "http_request",
            method = %method,
            uri = %uri,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        );

        let start = Instant::now();

        let response = next.run(request).instrument(span.clone()).await;

        let latency = start.elapsed();
        let status = response.status().as_u16();

        span.record("status", status);
        span.record("latency_ms", latency.as_millis() as i64);

        response
    }

    /// 请求 ID 中间件
    ///
    /// 为每个请求添加唯一 ID，便于日志关联。
    pub async fn request_id(mut request: Request, next: Next) -> Response {
        // 尝试从 header 获取请求 ID，没有则生成新的
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        request
            .extensions_mut()
            .insert(RequestId(request_id.clone()));

        let mut response = next.run(request).await;

        response.headers_mut().insert(
            "x-request-id",
            request_id
                .parse()
                .unwrap_or_else(|_| "unknown".parse().unwrap()),
        );

        response
    }

    /// 请求 ID 包装类型
    #[derive(Clone, Debug)]
    pub struct RequestId(pub String);

    impl RequestId {
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::middleware::RequestId;

    #[test]
    fn test_request_id_as_str() {
        let id = RequestId("abc-123".to_string());
        assert_eq!(id.as_str(), "abc-123");
    }
}
