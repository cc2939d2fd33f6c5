//! 角色检查中间件
//!
//! 管理接口要求 admin 角色，角色信息来自认证中间件注入的 Claims。

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

use crate::auth::Claims;

/// 角色检查中间件工厂
///
/// # 示例
/// ```ignore
/// .layer(axum::middleware::from_fn(require_role("admin")))
/// ```
pub fn require_role(
    role: &'static str,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move { check_role(request, next, role).await })
    }
}

/// 检查当前用户是否拥有指定角色
async fn check_role(request: Request<Body>, next: Next, required_role: &str) -> Response {
    // 由 auth_middleware 注入
    let claims = match request.extensions().get::<Claims>() {
        Some(claims) => claims.clone(),
        None => {
            return unauthorized_response("未登录");
        }
    };

    if claims.role == required_role {
        return next.run(request).await;
    }

    forbidden_response("无权访问该接口")
}

/// 生成 401 未授权响应
fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

/// 生成 403 禁止访问响应
fn forbidden_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "FORBIDDEN",
        "message": message,
        "data": null
    });

    (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
}
