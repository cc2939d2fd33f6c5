//! 推荐账本
//!
//! 注册时登记 pending 推荐记录，被推荐人完成首次付费后将记录置为
//! completed，并在推荐人达到阈值时原子地打开退款资格。
//!
//! 这里的函数都接受 `&mut PgConnection`，以便在支付结算事务内调用，
//! 保证推荐记账与订单完成原子提交。

use sqlx::PgConnection;
use tracing::{debug, info};

use crate::error::Result;

/// 登记一条 pending 推荐记录
///
/// referred_id 上有唯一约束，重复登记（同一用户被多次引用）按幂等处理。
pub async fn record_referral(
    conn: &mut PgConnection,
    referrer_id: i64,
    referred_id: i64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO referrals (referrer_id, referred_id, status)
        VALUES ($1, $2, 'pending')
        ON CONFLICT (referred_id) DO NOTHING
        "#,
    )
    .bind(referrer_id)
    .bind(referred_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(referred_id, "推荐记录已存在，跳过登记");
    }
    Ok(())
}

/// 被推荐人完成首次付费，将对应推荐记录置为 completed
///
/// 返回推荐人 ID（该用户没有推荐记录时返回 None）。
/// 只有 pending 记录会被更新：重复结算不会二次计数。
pub async fn credit_referral(conn: &mut PgConnection, referred_id: i64) -> Result<Option<i64>> {
    let referrer_id: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE referrals
        SET status = 'completed', completed_at = NOW()
        WHERE referred_id = $1 AND status = 'pending'
        RETURNING referrer_id
        "#,
    )
    .bind(referred_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(referrer_id) = referrer_id {
        info!(referrer_id, referred_id, "推荐记账完成");
    }
    Ok(referrer_id)
}

/// 查询推荐人的已完成推荐数
pub async fn completed_count(conn: &mut PgConnection, referrer_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM referrals WHERE referrer_id = $1 AND status = 'completed'",
    )
    .bind(referrer_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// 达到阈值时打开退款资格
///
/// 先对推荐人行加锁再计数：并发结算在读已提交隔离级别下各自
/// 计数时看不到对方未提交的记账，两笔同时越过阈值会都数出
/// 阈值减一而漏掉翻转。锁住推荐人行后，后一笔结算会等前一笔
/// 提交再计数，保证计数包含已越过阈值的全部记账。
/// 条件更新保证资格只打开一次：refund_status 必须还是 none。
/// 返回是否本次打开了资格。
pub async fn check_refund_eligibility(
    conn: &mut PgConnection,
    referrer_id: i64,
    threshold: i64,
) -> Result<bool> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(referrer_id)
        .execute(&mut *conn)
        .await?;

    let count = completed_count(conn, referrer_id).await?;
    if count < threshold {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET refund_eligible = TRUE, refund_status = 'eligible', updated_at = NOW()
        WHERE id = $1 AND refund_status = 'none'
        "#,
    )
    .bind(referrer_id)
    .execute(&mut *conn)
    .await?;

    let opened = result.rows_affected() > 0;
    if opened {
        info!(referrer_id, count, threshold, "推荐人达到阈值，退款资格已打开");
    }
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use notehub_shared::{config::DatabaseConfig, database::Database};

    use super::*;

    /// 完整账本链路：登记 -> 记账 -> 资格检查（需要数据库）
    #[tokio::test]
    #[ignore]
    async fn test_referral_ledger_flow() {
        let db = Database::connect(&DatabaseConfig::default()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        record_referral(&mut conn, 1, 2).await.unwrap();
        // 重复登记幂等
        record_referral(&mut conn, 1, 2).await.unwrap();

        let referrer = credit_referral(&mut conn, 2).await.unwrap();
        assert_eq!(referrer, Some(1));
        // 重复记账不二次计数
        let again = credit_referral(&mut conn, 2).await.unwrap();
        assert_eq!(again, None);

        let count = completed_count(&mut conn, 1).await.unwrap();
        assert!(count >= 1);
    }
}
