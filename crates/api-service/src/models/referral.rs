//! 推荐关系模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 推荐状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    /// 被推荐人已注册，尚未付费
    Pending,
    /// 被推荐人支付已结算，推荐完成（终态，不可变更）
    Completed,
}

impl ReferralStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// 数据库推荐记录
///
/// (referrer_id, referred_id) 中 referred_id 全局唯一：
/// 一个用户至多被一个推荐人推荐。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReferralRow {
    pub id: i64,
    pub referrer_id: i64,
    pub referred_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 推荐统计响应 DTO
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatsDto {
    pub referral_code: String,
    pub total_referrals: i64,
    pub completed_referrals: i64,
    pub refund_threshold: i64,
    pub refund_eligible: bool,
    pub refund_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_status_conversion() {
        assert_eq!(ReferralStatus::Pending.as_str(), "pending");
        assert_eq!(
            ReferralStatus::parse("completed"),
            Some(ReferralStatus::Completed)
        );
        assert_eq!(ReferralStatus::parse("done"), None);
    }

    /// 统计 DTO 的序列化字段名是 API 契约的一部分
    #[test]
    fn test_stats_dto_shape() {
        let dto = ReferralStatsDto {
            referral_code: "ABCD2345".to_string(),
            total_referrals: 5,
            completed_referrals: 3,
            refund_threshold: 20,
            refund_eligible: false,
            refund_status: "none".to_string(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["completedReferrals"], 3);
        assert_eq!(json["refundThreshold"], 20);
    }
}
