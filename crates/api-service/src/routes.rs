//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::{handlers, middleware::require_role, state::AppState};

/// 构建认证相关的路由（公开路由，无需认证）
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
}

/// 构建支付相关的路由
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payment/create-order", post(handlers::payment::create_order))
        .route("/payment/verify", post(handlers::payment::verify_payment))
}

/// 构建推荐相关的路由
fn referral_routes() -> Router<AppState> {
    Router::new()
        .route("/referrals/stats", get(handlers::referral::stats))
        .route(
            "/referrals/request-refund",
            post(handlers::referral::request_refund),
        )
}

/// 构建内容目录路由
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/teachers", get(handlers::catalog::list_teachers))
        .route(
            "/teachers/{id}/reviews",
            get(handlers::catalog::list_teacher_reviews),
        )
        .route("/reviews", post(handlers::catalog::create_review))
        .route("/reviews/my-reviews", get(handlers::catalog::my_reviews))
        .route("/notes", get(handlers::catalog::list_notes))
}

/// 构建通知路由
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            patch(handlers::notification::mark_read),
        )
}

/// 构建管理控制台路由（整个子树要求 admin 角色）
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/users/{id}", patch(handlers::admin::update_user_role))
        .route(
            "/admin/process-refund",
            post(handlers::admin::process_refund),
        )
        .route("/admin/teachers", post(handlers::admin::create_teacher))
        .layer(middleware::from_fn(require_role("admin")))
}

/// 构建完整的 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(payment_routes())
        .merge(referral_routes())
        .merge(catalog_routes())
        .merge(notification_routes())
        .merge(admin_routes())
}
