//! 通知与审计日志模型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 数据库通知记录
///
/// 只有 read 标志可变更，其余字段写入后不可修改，用户不可删除。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// 通知响应 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for NotificationDto {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// 审计日志实体
///
/// 记录所有特权操作，只追加，永不修改或删除。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    /// 操作人 ID
    pub actor_id: i64,
    /// 操作人邮箱（冗余存储，便于查询展示）
    pub actor_email: Option<String>,
    /// 操作动作（role_updated、refund_processed 等）
    pub action: String,
    /// 操作目标类型
    pub target_type: Option<String>,
    /// 操作目标 ID
    pub target_id: Option<String>,
    /// 操作详情
    pub details: Option<serde_json::Value>,
    /// 操作者 IP 地址
    pub ip_address: Option<String>,
    /// 客户端 User-Agent
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 审计动作常量
pub mod actions {
    pub const ROLE_UPDATED: &str = "role_updated";
    pub const REFUND_PROCESSED: &str = "refund_processed";
    pub const TEACHER_CREATED: &str = "teacher_created";
}
