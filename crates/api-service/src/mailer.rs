//! 邮件发送器
//!
//! 通过邮件服务商 HTTP API 发送事务邮件（支付回执等）。
//! 每次发送尝试都会在 email_logs 表留下记录；发送失败只记录日志，
//! 永远不使上层业务操作失败。
//!
//! 未配置 api_key 时退化为模拟发送（仅记录日志），便于在无外部
//! 依赖的环境中验证完整业务链路。

use notehub_shared::config::MailConfig;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info, warn};

/// 邮件发送器
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl Mailer {
    /// 创建邮件发送器
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        }
    }

    /// 发送邮件并记录发送结果
    ///
    /// 返回值刻意为 ()：发送失败对调用方不可见，只落库和打日志。
    pub async fn send(&self, pool: &PgPool, user_id: i64, to: &str, subject: &str, body: &str) {
        let outcome = self.deliver(to, subject, body).await;

        let (status, err_text) = match &outcome {
            Ok(()) => ("sent", None),
            Err(e) => {
                error!(error = %e, to, subject, "邮件发送失败");
                ("failed", Some(e.clone()))
            }
        };

        // 发送记录本身写失败也不能影响业务，只告警
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO email_logs (user_id, recipient, subject, status, error)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(to)
        .bind(subject)
        .bind(status)
        .bind(err_text)
        .execute(pool)
        .await
        {
            warn!(error = %e, "邮件发送记录写入失败");
        }
    }

    /// 实际投递
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if self.api_key.is_empty() {
            // 模拟发送：生产环境中替换为真实服务商凭据
            info!(to, subject, "模拟发送邮件");
            return Ok(());
        }

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| format!("请求失败: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("服务商返回 HTTP {}", response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 未配置 api_key 时 deliver 走模拟路径，不发起网络请求
    #[tokio::test]
    async fn test_deliver_mock_mode() {
        let mailer = Mailer::new(&MailConfig {
            api_key: String::new(),
            ..Default::default()
        });
        let result = mailer.deliver("a@b.edu", "回执", "正文").await;
        assert!(result.is_ok());
    }
}
