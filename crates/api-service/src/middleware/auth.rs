//! JWT 认证中间件
//!
//! 从会话 Cookie 中提取 Token，验证后将用户信息注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::auth::TOKEN_COOKIE;
use crate::state::AppState;

/// 认证中间件
///
/// 从 notehub_token Cookie 中提取 JWT，验证后将 Claims 注入请求扩展。
/// 对于公开路由（注册、登录等），跳过验证。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    // 公开路由列表（不需要认证）
    let public_paths = [
        "/api/auth/register",
        "/api/auth/login",
        "/api/auth/logout",
        "/health",
        "/ready",
    ];

    if public_paths.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let token = match jar.get(TOKEN_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            return unauthorized_response("未登录");
        }
    };

    match state.jwt_manager.verify_token(&token) {
        Ok(claims) => {
            // 将 Claims 注入请求扩展，供后续处理器使用
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(_) => unauthorized_response("会话无效或已过期"),
    }
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
