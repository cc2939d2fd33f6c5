//! 内容目录模型
//!
//! 讲师、点评与笔记实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 数据库讲师记录
///
/// (name, department) 组合唯一。列表会进缓存，因此派生 Deserialize。
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRow {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

/// 数据库点评记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub teacher_id: i64,
    pub user_id: i64,
    /// 评分 1-5
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 点评响应 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: i64,
    pub teacher_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewDto {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            teacher_id: row.teacher_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// 数据库笔记记录
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRow {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub branch: String,
    pub year: i32,
    pub file_url: String,
    pub uploader_id: i64,
    pub created_at: DateTime<Utc>,
}
