//! 支付结算
//!
//! 回调签名通过后的全部状态变更：订单完成、账户升级、推荐记账、
//! 资格检查和通知写入在同一个数据库事务中提交，以 gateway_order_id
//! 为幂等键，重复回调不产生额外效果。
//!
//! 本模块只依赖数据库连接池，网关签名验证、缓存失效和邮件回执
//! 都在 HTTP 层处理。

use sqlx::PgPool;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::models::OrderStatus;
use crate::notify::{self, NotificationTemplate};
use crate::referral;

/// 结算结果
#[derive(Debug)]
pub enum SettlementOutcome {
    /// 本次回调完成结算
    Applied {
        amount: i64,
        currency: String,
        /// 本次完成记账的推荐人（调用方据此失效其统计缓存）
        referrer_id: Option<i64>,
    },
    /// 回调重放命中已完成订单，按幂等成功处理
    Replayed { role: String },
}

/// 结算一笔订单
///
/// 只有 created 状态的订单会被推进；订单已完成时返回 Replayed，
/// 其余状态按错误返回。订单归属与回调携带的身份不一致时拒绝。
pub async fn settle_order(
    pool: &PgPool,
    user_id: i64,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    refund_threshold: i64,
) -> Result<SettlementOutcome> {
    let mut tx = pool.begin().await?;

    // 幂等键：只有 created 状态的订单会被本次回调推进
    let settled: Option<(i64, i64, String, Option<String>)> = sqlx::query_as(
        r#"
        UPDATE payment_orders
        SET status = 'completed', gateway_payment_id = $2, completed_at = NOW(), updated_at = NOW()
        WHERE gateway_order_id = $1 AND status = 'created'
        RETURNING user_id, amount, currency, referral_code
        "#,
    )
    .bind(gateway_order_id)
    .bind(gateway_payment_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((order_user_id, amount, currency, referral_code)) = settled else {
        tx.rollback().await?;
        return settle_replay(pool, gateway_order_id).await;
    };

    if order_user_id != user_id {
        tx.rollback().await?;
        return Err(ApiError::Forbidden("订单不属于当前用户".to_string()));
    }

    // 账户升级：角色与支付金额
    sqlx::query(
        r#"
        UPDATE users SET role = 'paid', payment_amount = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(&mut *tx)
    .await?;

    // 推荐记账：下单时附带的推荐码优先，否则沿用注册时登记的关系
    if let Some(code) = &referral_code {
        let referrer_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE referral_code = $1 AND id <> $2")
                .bind(code)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(referrer_id) = referrer_id {
            referral::record_referral(&mut *tx, referrer_id, user_id).await?;
        }
    }

    let referrer_id = referral::credit_referral(&mut *tx, user_id).await?;
    if let Some(referrer_id) = referrer_id {
        referral::check_refund_eligibility(&mut *tx, referrer_id, refund_threshold).await?;
    }

    notify::notify(
        &mut *tx,
        user_id,
        &NotificationTemplate::PaymentSuccess {
            amount,
            currency: currency.clone(),
        },
    )
    .await?;

    tx.commit().await?;

    info!(user_id, gateway_order_id, amount, "支付结算完成");
    Ok(SettlementOutcome::Applied {
        amount,
        currency,
        referrer_id,
    })
}

/// 处理结算回调的重放
///
/// 订单已完成时按幂等成功返回，其余情况按错误返回。
async fn settle_replay(pool: &PgPool, gateway_order_id: &str) -> Result<SettlementOutcome> {
    let existing: Option<(String, String)> = sqlx::query_as(
        r#"
        SELECT o.status, u.role
        FROM payment_orders o JOIN users u ON u.id = o.user_id
        WHERE o.gateway_order_id = $1
        "#,
    )
    .bind(gateway_order_id)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some((status, role)) if status == OrderStatus::Completed.as_str() => {
            info!(gateway_order_id, "回调重放命中已完成订单，按幂等成功处理");
            Ok(SettlementOutcome::Replayed { role })
        }
        Some((status, _)) => Err(ApiError::Validation(format!(
            "订单状态不允许结算: {}",
            status
        ))),
        None => Err(ApiError::OrderNotFound(gateway_order_id.to_string())),
    }
}
