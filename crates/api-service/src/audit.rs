//! 审计日志
//!
//! 将特权操作写入 audit_logs 表（只追加）。
//! 采用 fire-and-forget 模式：日志写入失败不影响业务响应，
//! 避免审计功能故障导致正常业务不可用。

use sqlx::PgPool;
use tracing::{debug, error};

/// 审计条目
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_id: i64,
    pub actor_email: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    /// 构建新的审计条目
    pub fn new(actor_id: i64, action: impl Into<String>) -> Self {
        Self {
            actor_id,
            actor_email: None,
            action: action.into(),
            target_type: None,
            target_id: None,
            details: None,
        }
    }

    /// 设置操作人邮箱
    pub fn with_actor_email(mut self, email: impl Into<String>) -> Self {
        self.actor_email = Some(email.into());
        self
    }

    /// 设置操作目标
    pub fn with_target(
        mut self,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.into());
        self
    }

    /// 设置操作详情
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// 异步写入审计日志
///
/// 写入在独立任务中进行，不阻塞业务响应；失败仅记录错误日志。
pub fn record(pool: &PgPool, entry: AuditEntry) {
    let pool = pool.clone();
    tokio::spawn(async move {
        write_audit_log(&pool, &entry).await;
    });
}

/// 同步写入审计日志（需要在当前任务内确认写入结果时使用）
pub async fn write_audit_log(pool: &PgPool, entry: &AuditEntry) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs
            (actor_id, actor_email, action, target_type, target_id, details)
        VALUES
            ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.actor_id)
    .bind(&entry.actor_email)
    .bind(&entry.action)
    .bind(&entry.target_type)
    .bind(&entry.target_id)
    .bind(&entry.details)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            debug!(
                actor_id = entry.actor_id,
                action = %entry.action,
                "审计日志已记录"
            );
        }
        Err(e) => {
            // 审计日志写入失败仅记录错误，不影响业务
            error!(
                error = %e,
                actor_id = entry.actor_id,
                action = %entry.action,
                "审计日志写入失败"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry_builder() {
        let entry = AuditEntry::new(1, "refund_processed")
            .with_actor_email("admin@campus.edu")
            .with_target("user", "42")
            .with_details(serde_json::json!({ "amount": 49900 }));

        assert_eq!(entry.actor_id, 1);
        assert_eq!(entry.action, "refund_processed");
        assert_eq!(entry.actor_email, Some("admin@campus.edu".to_string()));
        assert_eq!(entry.target_type, Some("user".to_string()));
        assert_eq!(entry.target_id, Some("42".to_string()));
        assert_eq!(entry.details.unwrap()["amount"], 49900);
    }
}
