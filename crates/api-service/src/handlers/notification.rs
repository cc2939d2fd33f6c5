//! 通知相关的 HTTP 处理器
//!
//! 用户只能看到和操作自己的通知；通知只有 read 标志可变更。

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::auth::Claims;
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::{NotificationDto, NotificationRow};
use crate::state::AppState;

/// 单次返回的最大通知条数
const NOTIFICATION_LIMIT: i64 = 50;

/// 查询当前用户的通知列表
///
/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<NotificationDto>>>> {
    let user_id = claims.user_id()?;

    let rows: Vec<NotificationRow> = sqlx::query_as(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(NOTIFICATION_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(NotificationDto::from).collect(),
    )))
}

/// 将通知标记为已读
///
/// PATCH /api/notifications/{id}/read
///
/// 通知不属于当前用户时按不存在处理，避免泄露他人通知的存在性。
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let user_id = claims.user_id()?;

    let updated = sqlx::query(
        "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .execute(&state.pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::NotFound(format!("通知 {}", id)));
    }

    Ok(Json(ApiResponse::<()>::success_empty()))
}
