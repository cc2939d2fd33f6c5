//! 通知模板与写入
//!
//! 根据通知模板生成标题和正文并写入 notifications 表。
//! 模板当前硬编码，未来可扩展为从配置中心动态加载。

use sqlx::PgConnection;

use crate::error::Result;

/// 通知模板
///
/// 金额一律使用最小货币单位，渲染时转换为带两位小数的可读金额。
#[derive(Debug, Clone)]
pub enum NotificationTemplate {
    /// 支付成功
    PaymentSuccess { amount: i64, currency: String },
    /// 退款已发放
    RefundIssued { amount: i64, currency: String },
}

impl NotificationTemplate {
    /// 渲染标题
    ///
    /// 标题保持简洁固定，不做变量替换，便于客户端聚合展示同类通知
    pub fn render_title(&self) -> String {
        match self {
            Self::PaymentSuccess { .. } => "支付成功".to_string(),
            Self::RefundIssued { .. } => "退款已发放".to_string(),
        }
    }

    /// 渲染正文
    pub fn render_body(&self) -> String {
        match self {
            Self::PaymentSuccess { amount, currency } => {
                format!(
                    "您已成功支付 {}，会员权益已生效。",
                    format_amount(*amount, currency)
                )
            }
            Self::RefundIssued { amount, currency } => {
                format!(
                    "您的退款 {} 已发放，请留意到账通知。",
                    format_amount(*amount, currency)
                )
            }
        }
    }
}

/// 将最小货币单位金额格式化为可读字符串
fn format_amount(amount: i64, currency: &str) -> String {
    format!("{} {}.{:02}", currency, amount / 100, (amount % 100).abs())
}

/// 写入通知（未读状态）
///
/// 接收连接而不是连接池，以便在结算事务内调用。
pub async fn notify(
    conn: &mut PgConnection,
    user_id: i64,
    template: &NotificationTemplate,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, title, body)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(template.render_title())
    .bind(template.render_body())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(49900, "INR"), "INR 499.00");
        assert_eq!(format_amount(105, "INR"), "INR 1.05");
        assert_eq!(format_amount(100, "USD"), "USD 1.00");
    }

    #[test]
    fn test_payment_success_template() {
        let template = NotificationTemplate::PaymentSuccess {
            amount: 49900,
            currency: "INR".to_string(),
        };
        assert_eq!(template.render_title(), "支付成功");
        assert!(template.render_body().contains("INR 499.00"));
    }

    #[test]
    fn test_refund_issued_template() {
        let template = NotificationTemplate::RefundIssued {
            amount: 49900,
            currency: "INR".to_string(),
        };
        assert_eq!(template.render_title(), "退款已发放");
        assert!(template.render_body().contains("INR 499.00"));
    }
}
