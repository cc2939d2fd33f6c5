//! 管理控制台的 HTTP 处理器
//!
//! 用户管理、管理员退款和讲师录入。所有操作要求 admin 角色
//! （由路由层的角色中间件保证），特权变更写入审计日志。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use validator::Validate;

use crate::audit::{self, AuditEntry};
use crate::auth::Claims;
use crate::dto::{ApiResponse, PageResponse, PaginationParams};
use crate::error::{ApiError, Result};
use crate::handlers::auth::unique_constraint;
use crate::models::{TeacherRow, UserDto, UserRole, actions};
use crate::models::user::UserRow;
use crate::refund::{self, RefundPath};
use crate::state::AppState;
use notehub_shared::cache::CacheKey;

// ============================================
// 请求/响应 DTO
// ============================================

/// 角色变更请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// 管理员退款请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRefundRequest {
    pub user_id: i64,
}

/// 管理员退款响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRefundResponse {
    pub user_id: i64,
    pub refund_id: String,
    pub amount: i64,
}

/// 讲师录入请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeacherRequest {
    #[validate(length(min = 1, max = 100, message = "讲师姓名长度必须在 1-100 之间"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "院系长度必须在 1-100 之间"))]
    pub department: String,
}

// ============================================
// API 处理器
// ============================================

/// 分页查询用户列表
///
/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<UserDto>>>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let items = rows.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        pagination.page,
        pagination.limit(),
    ))))
}

/// 变更用户角色
///
/// PATCH /api/admin/users/{id}
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<UserDto>>> {
    let new_role =
        UserRole::parse(&req.role).ok_or_else(|| ApiError::Validation(format!("无效的角色: {}", req.role)))?;

    let old_role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::UserNotFound(id.to_string()))?;

    let user: UserRow = sqlx::query_as(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(new_role.as_str())
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        AuditEntry::new(claims.user_id()?, actions::ROLE_UPDATED)
            .with_actor_email(&claims.email)
            .with_target("user", id.to_string())
            .with_details(json!({ "from": old_role, "to": new_role.as_str() })),
    );

    info!(admin = %claims.email, user_id = id, role = new_role.as_str(), "用户角色已变更");
    Ok(Json(ApiResponse::success(user.into())))
}

/// 管理员为用户发起退款
///
/// POST /api/admin/process-refund
///
/// 与自助路径共用同一套状态机；额外允许对抢占已过期的 pending
/// 退款（上次网关调用失败后长期未推进）重新抢占并重试。
pub async fn process_refund(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProcessRefundRequest>,
) -> Result<Json<ApiResponse<ProcessRefundResponse>>> {
    let outcome = refund::process_refund(
        &state.pool,
        &state.gateway,
        &state.gateway_config.currency,
        req.user_id,
        RefundPath::Admin,
    )
    .await?;

    audit::record(
        &state.pool,
        AuditEntry::new(claims.user_id()?, actions::REFUND_PROCESSED)
            .with_actor_email(&claims.email)
            .with_target("user", req.user_id.to_string())
            .with_details(json!({ "refundId": outcome.refund_id, "amount": outcome.amount })),
    );

    if let Err(e) = state
        .cache
        .delete(&CacheKey::referral_stats(req.user_id))
        .await
    {
        debug!(error = %e, "推荐统计缓存清除失败");
    }

    info!(admin = %claims.email, user_id = req.user_id, refund_id = %outcome.refund_id, "管理员退款完成");
    Ok(Json(ApiResponse::success(ProcessRefundResponse {
        user_id: req.user_id,
        refund_id: outcome.refund_id,
        amount: outcome.amount,
    })))
}

/// 录入讲师
///
/// POST /api/admin/teachers
pub async fn create_teacher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTeacherRequest>,
) -> Result<Json<ApiResponse<TeacherRow>>> {
    req.validate()?;

    let teacher: TeacherRow = sqlx::query_as(
        "INSERT INTO teachers (name, department) VALUES ($1, $2) RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.department)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match unique_constraint(&e) {
        Some("teachers_name_department_key") => ApiError::DuplicateTeacher {
            name: req.name.clone(),
            department: req.department.clone(),
        },
        _ => e.into(),
    })?;

    audit::record(
        &state.pool,
        AuditEntry::new(claims.user_id()?, actions::TEACHER_CREATED)
            .with_actor_email(&claims.email)
            .with_target("teacher", teacher.id.to_string()),
    );

    // 讲师列表缓存失效
    if let Err(e) = state.cache.delete(&CacheKey::teacher_list()).await {
        debug!(error = %e, "讲师列表缓存清除失败");
    }

    info!(admin = %claims.email, teacher_id = teacher.id, "讲师已录入");
    Ok(Json(ApiResponse::success(teacher)))
}
