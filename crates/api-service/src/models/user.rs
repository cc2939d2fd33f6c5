//! 用户模型
//!
//! 用户实体、角色与退款状态机

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// 免费用户
    Free,
    /// 付费会员
    Paid,
    /// 管理员
    Admin,
}

impl UserRole {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::Admin => "admin",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// 退款状态
///
/// 状态只能沿 none -> eligible -> pending -> issued 前进，
/// 不允许跳跃或回退。状态变更在 referral / refund 模块通过条件更新
/// （UPDATE ... WHERE refund_status = 当前值）落库，防止并发丢失更新。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// 无退款资格
    None,
    /// 已获得退款资格
    Eligible,
    /// 退款处理中（已抢占资格，网关调用进行中或待重试）
    Pending,
    /// 退款已发放
    Issued,
}

impl RefundStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Eligible => "eligible",
            Self::Pending => "pending",
            Self::Issued => "issued",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "eligible" => Some(Self::Eligible),
            "pending" => Some(Self::Pending),
            "issued" => Some(Self::Issued),
            _ => None,
        }
    }
}

/// 数据库用户记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub branch: String,
    pub year: i32,
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub refund_eligible: bool,
    pub refund_status: String,
    /// 最近一次退款处理权被抢占的时间
    pub refund_claimed_at: Option<DateTime<Utc>>,
    pub payment_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 用户响应 DTO（不含密码哈希等敏感字段）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub branch: String,
    pub year: i32,
    pub referral_code: String,
    pub refund_eligible: bool,
    pub refund_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            branch: row.branch,
            year: row.year,
            referral_code: row.referral_code,
            refund_eligible: row.refund_eligible,
            refund_status: row.refund_status,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        assert_eq!(UserRole::Paid.as_str(), "paid");
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn test_refund_status_conversion() {
        assert_eq!(RefundStatus::Eligible.as_str(), "eligible");
        assert_eq!(RefundStatus::parse("issued"), Some(RefundStatus::Issued));
        assert_eq!(RefundStatus::parse("refunded"), None);
    }

    /// DTO 不携带密码哈希
    #[test]
    fn test_user_dto_excludes_credentials() {
        let row = UserRow {
            id: 1,
            name: "Asha".to_string(),
            email: "asha@campus.edu".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role: "free".to_string(),
            branch: "CSE".to_string(),
            year: 2,
            referral_code: "ABCD2345".to_string(),
            referred_by: None,
            refund_eligible: false,
            refund_status: "none".to_string(),
            refund_claimed_at: None,
            payment_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let dto = UserDto::from(row);
        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("referralCode"));
    }
}
