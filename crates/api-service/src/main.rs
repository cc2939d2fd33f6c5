//! 学生笔记平台 API 服务
//!
//! 提供笔记分享、讲师点评、会员支付、推荐返现等 REST API。

use std::sync::Arc;

use axum::{Json, Router, http::HeaderValue, middleware, routing::get};
use notehub_api_service::{
    auth::{JwtConfig, JwtManager},
    gateway::PaymentGateway,
    mailer::Mailer,
    middleware::auth_middleware,
    routes,
    state::AppState,
};
use notehub_shared::{
    cache::Cache,
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：从 config/{service_name}.toml 加载，可被 NOTEHUB_ 环境变量覆盖
    let config = AppConfig::load("api-service").unwrap_or_default();

    observability::init(&config.observability)?;

    info!("Starting notehub-api-service on {}", config.server_addr());

    // 必需配置缺失在启动日志和健康检查中暴露，不阻止进程启动
    let missing = config.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "必需配置缺失，相关功能将不可用");
    }

    // 初始化基础设施
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let cache = Arc::new(Cache::new(&config.redis)?);

    // JWT 密钥：生产环境必须通过环境变量注入，开发环境使用默认值
    let jwt_secret = std::env::var("NOTEHUB_JWT_SECRET").unwrap_or_else(|_| {
        if config.is_production() {
            panic!("NOTEHUB_JWT_SECRET must be set in production environment");
        }
        warn!("Using default JWT secret - set NOTEHUB_JWT_SECRET for production");
        JwtConfig::default().secret
    });

    let jwt_config = JwtConfig {
        secret: jwt_secret,
        ..Default::default()
    };

    let state = AppState::new(
        db.pool().clone(),
        cache.clone(),
        JwtManager::new(jwt_config),
        PaymentGateway::new(&config.gateway),
        Mailer::new(&config.mail),
        config.gateway.clone(),
        config.referral.clone(),
    );

    // CORS 配置：通过 NOTEHUB_CORS_ORIGINS 环境变量控制允许的来源
    let allowed_origins = std::env::var("NOTEHUB_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    let cors = if allowed_origins == "*" {
        if config.is_production() {
            warn!("NOTEHUB_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .route(
            "/health",
            get({
                let db_for_health = db.clone();
                let missing_for_health = missing.clone();
                move || health_check(db_for_health.clone(), missing_for_health.clone())
            }),
        )
        .route(
            "/ready",
            get({
                let db_for_ready = db.clone();
                let cache_for_ready = cache.clone();
                move || readiness_check(db_for_ready.clone(), cache_for_ready.clone())
            }),
        )
        .layer(cors)
        // 认证中间件：从 Cookie 验证 JWT
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // 可观测性中间件：请求追踪和请求 ID
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM（K8s 停止 Pod）或 Ctrl+C 时，
    // 停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 健康检查：数据库可达且必需配置齐全时返回 200，否则 503
///
/// 响应中列出缺失的配置项名称，便于部署排查。
async fn health_check(
    db: Database,
    missing: Vec<&'static str>,
) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    let db_ok = db.health_check().await.is_ok();
    let healthy = db_ok && missing.is_empty();

    let status = if healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "ok" } else { "unhealthy" },
            "service": "notehub-api-service",
            "checks": {
                "database": if db_ok { "ok" } else { "fail" },
                "missingConfig": missing,
            }
        })),
    )
}

/// 就绪探针：检查数据库和 Redis 连接是否可用
///
/// K8s 就绪探针失败时会将 Pod 从 Service 端点移除，
/// 避免将流量路由到无法正常处理请求的实例。
async fn readiness_check(db: Database, cache: Arc<Cache>) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    let cache_ok = cache.health_check().await.is_ok();
    let all_ok = db_ok && cache_ok;

    Json(serde_json::json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": "notehub-api-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if cache_ok { "ok" } else { "fail" }
        }
    }))
}
