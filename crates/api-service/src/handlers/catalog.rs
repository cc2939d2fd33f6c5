//! 内容目录的 HTTP 处理器
//!
//! 讲师列表、讲师点评和笔记列表。列表读取走只读缓存，
//! 缓存故障一律降级为直查数据库。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

use crate::auth::Claims;
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::{NoteRow, ReviewDto, ReviewRow, TeacherRow};
use crate::state::AppState;
use notehub_shared::cache::CacheKey;

/// 目录列表缓存的 TTL
const CATALOG_CACHE_TTL: Duration = Duration::from_secs(300);

// ============================================
// 请求 DTO
// ============================================

/// 点评请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub teacher_id: i64,
    #[validate(range(min = 1, max = 5, message = "评分必须在 1-5 之间"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "评语不能超过 2000 字"))]
    pub comment: Option<String>,
}

/// 笔记列表过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilter {
    pub branch: Option<String>,
    pub year: Option<i32>,
}

// ============================================
// API 处理器
// ============================================

/// 查询讲师列表
///
/// GET /api/teachers
pub async fn list_teachers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TeacherRow>>>> {
    let cache_key = CacheKey::teacher_list();
    match state.cache.get::<Vec<TeacherRow>>(&cache_key).await {
        Ok(Some(cached)) => {
            debug!("讲师列表缓存命中");
            return Ok(Json(ApiResponse::success(cached)));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "讲师列表缓存读取失败，回退数据库"),
    }

    let teachers: Vec<TeacherRow> =
        sqlx::query_as("SELECT * FROM teachers ORDER BY department, name")
            .fetch_all(&state.pool)
            .await?;

    if let Err(e) = state.cache.set(&cache_key, &teachers, CATALOG_CACHE_TTL).await {
        debug!(error = %e, "讲师列表缓存写入失败");
    }

    Ok(Json(ApiResponse::success(teachers)))
}

/// 查询某讲师的点评列表
///
/// GET /api/teachers/{id}/reviews
pub async fn list_teacher_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teachers WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists {
        return Err(ApiError::NotFound(format!("讲师 {}", id)));
    }

    let rows: Vec<ReviewRow> = sqlx::query_as(
        "SELECT * FROM reviews WHERE teacher_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(ReviewDto::from).collect(),
    )))
}

/// 发表讲师点评
///
/// POST /api/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teachers WHERE id = $1)")
        .bind(req.teacher_id)
        .fetch_one(&state.pool)
        .await?;
    if !exists {
        return Err(ApiError::NotFound(format!("讲师 {}", req.teacher_id)));
    }

    let review: ReviewRow = sqlx::query_as(
        r#"
        INSERT INTO reviews (teacher_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.teacher_id)
    .bind(user_id)
    .bind(req.rating)
    .bind(&req.comment)
    .fetch_one(&state.pool)
    .await?;

    info!(user_id, teacher_id = req.teacher_id, rating = req.rating, "点评已发表");
    Ok(Json(ApiResponse::success(review.into())))
}

/// 查询当前用户的点评
///
/// GET /api/reviews/my-reviews
pub async fn my_reviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>> {
    let user_id = claims.user_id()?;

    let rows: Vec<ReviewRow> = sqlx::query_as(
        "SELECT * FROM reviews WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(ReviewDto::from).collect(),
    )))
}

/// 查询笔记列表
///
/// GET /api/notes
///
/// 未指定过滤条件时默认取当前用户档案中的院系与年级。
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<ApiResponse<Vec<NoteRow>>>> {
    let user_id = claims.user_id()?;

    let (branch, year) = match (filter.branch, filter.year) {
        (Some(branch), Some(year)) => (branch, year),
        (branch, year) => {
            let profile: Option<(String, i32)> =
                sqlx::query_as("SELECT branch, year FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&state.pool)
                    .await?;
            let Some((profile_branch, profile_year)) = profile else {
                return Err(ApiError::UserNotFound(user_id.to_string()));
            };
            (branch.unwrap_or(profile_branch), year.unwrap_or(profile_year))
        }
    };

    let cache_key = CacheKey::note_list(&branch, year);
    match state.cache.get::<Vec<NoteRow>>(&cache_key).await {
        Ok(Some(cached)) => {
            debug!(branch, year, "笔记列表缓存命中");
            return Ok(Json(ApiResponse::success(cached)));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "笔记列表缓存读取失败，回退数据库"),
    }

    let notes: Vec<NoteRow> = sqlx::query_as(
        "SELECT * FROM notes WHERE branch = $1 AND year = $2 ORDER BY created_at DESC",
    )
    .bind(&branch)
    .bind(year)
    .fetch_all(&state.pool)
    .await?;

    if let Err(e) = state.cache.set(&cache_key, &notes, CATALOG_CACHE_TTL).await {
        debug!(error = %e, "笔记列表缓存写入失败");
    }

    Ok(Json(ApiResponse::success(notes)))
}
