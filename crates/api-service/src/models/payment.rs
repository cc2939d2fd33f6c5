//! 支付订单模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 只允许从 created 向前迁移到 completed 或 failed，永不回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 已创建，等待支付回调
    Created,
    /// 支付成功，已结算
    Completed,
    /// 支付失败
    Failed,
}

impl OrderStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// 数据库订单记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentOrderRow {
    pub id: i64,
    /// 网关侧订单 ID
    pub gateway_order_id: String,
    /// 网关侧支付 ID（结算时写入）
    pub gateway_payment_id: Option<String>,
    pub user_id: i64,
    /// 金额（最小货币单位）
    pub amount: i64,
    pub currency: String,
    pub status: String,
    /// 下单时附带的推荐码（结算时才校验归属）
    pub referral_code: Option<String>,
    /// 结算完成时间
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 订单响应 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl From<PaymentOrderRow> for OrderDto {
    fn from(row: PaymentOrderRow) -> Self {
        Self {
            gateway_order_id: row.gateway_order_id,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_conversion() {
        assert_eq!(OrderStatus::Created.as_str(), "created");
        assert_eq!(OrderStatus::parse("completed"), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse("refunded"), None);
    }
}
