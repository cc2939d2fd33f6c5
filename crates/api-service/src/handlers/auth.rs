//! 认证相关的 HTTP 处理器
//!
//! 提供注册、登录和登出 API。凭证 Token 通过 HTTP-only Cookie 下发。

use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{TOKEN_COOKIE, generate_referral_code, hash_password, verify_password};
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::UserDto;
use crate::models::user::UserRow;
use crate::referral;
use crate::state::AppState;

/// 推荐码生成冲突时的最大重试次数
const CODE_RETRY_LIMIT: u32 = 5;

// ============================================
// 请求/响应 DTO
// ============================================

/// 注册请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "姓名长度必须在 1-100 之间"))]
    pub name: String,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "密码长度必须在 8-100 之间"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "院系不能为空"))]
    pub branch: String,
    #[validate(range(min = 1, max = 6, message = "年级必须在 1-6 之间"))]
    pub year: i32,
    /// 推荐人的推荐码（可选）
    #[validate(length(min = 1, max = 16, message = "推荐码格式不正确"))]
    pub referral_code: Option<String>,
}

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "密码不能为空"))]
    pub password: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserDto,
    pub expires_at: i64,
}

// ============================================
// API 处理器
// ============================================

/// 用户注册
///
/// POST /api/auth/register
///
/// 推荐码归属在注册时解析：解析成功则登记一条 pending 推荐记录，
/// 解析失败静默忽略（不影响注册本身）。
/// 生成的推荐码依赖数据库唯一索引兜底，冲突时重新生成。
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>> {
    req.validate()?;

    // 先解析推荐人，referred_by 写入后不再变更
    let referrer_id: Option<i64> = match &req.referral_code {
        Some(code) => {
            let id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE referral_code = $1")
                .bind(code)
                .fetch_optional(&state.pool)
                .await?;
            if id.is_none() {
                warn!(code, "注册附带的推荐码无法解析，忽略");
            }
            id
        }
        None => None,
    };

    let password_hash = hash_password(&req.password)?;

    let mut attempts = 0;
    let user: UserRow = loop {
        attempts += 1;
        let code = generate_referral_code();

        let result: std::result::Result<UserRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash, role, branch, year, referral_code, referred_by)
            VALUES ($1, $2, $3, 'free', $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.branch)
        .bind(req.year)
        .bind(&code)
        .bind(referrer_id)
        .fetch_one(&state.pool)
        .await;

        match result {
            Ok(user) => break user,
            Err(e) => match unique_constraint(&e) {
                Some("users_email_key") => {
                    return Err(ApiError::EmailTaken(req.email.clone()));
                }
                Some("users_referral_code_key") if attempts < CODE_RETRY_LIMIT => {
                    warn!(attempts, "推荐码生成冲突，重新生成");
                    continue;
                }
                _ => return Err(e.into()),
            },
        }
    };

    if let Some(referrer_id) = referrer_id {
        let mut conn = state.pool.acquire().await?;
        referral::record_referral(&mut conn, referrer_id, user.id).await?;
    }

    info!(user_id = user.id, email = %user.email, "用户注册成功");
    Ok(Json(ApiResponse::success(user.into())))
}

/// 用户登录
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    req.validate()?;

    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let (token, expires_at) = state
        .jwt_manager
        .generate_token(user.id, &user.email, &user.role)?;

    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    info!(user_id = user.id, "用户登录成功");
    Ok((
        jar.add(cookie),
        Json(ApiResponse::success(LoginResponse {
            user: user.into(),
            expires_at,
        })),
    ))
}

/// 用户登出
///
/// POST /api/auth/logout
///
/// JWT 是无状态的，登出只需清除 Cookie。
pub async fn logout(jar: CookieJar) -> Result<(CookieJar, Json<ApiResponse<()>>)> {
    let cookie = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    Ok((
        jar.remove(cookie),
        Json(ApiResponse::<()>::success_empty()),
    ))
}

/// 提取数据库唯一约束冲突的约束名
pub(crate) fn unique_constraint(e: &sqlx::Error) -> Option<&str> {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            return db_err.constraint();
        }
    }
    None
}
