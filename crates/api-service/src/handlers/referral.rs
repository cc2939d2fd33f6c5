//! 推荐相关的 HTTP 处理器
//!
//! 推荐统计查询（带只读缓存）和自助退款申请。

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::Claims;
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::ReferralStatsDto;
use crate::refund::{self, RefundPath};
use crate::state::AppState;
use notehub_shared::cache::CacheKey;

/// 退款响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund_id: String,
    pub amount: i64,
    pub refund_status: String,
}

/// 查询推荐统计
///
/// GET /api/referrals/stats
///
/// 缓存仅用于降低读延迟：缓存读写失败降级为直查数据库，
/// 永远不影响返回结果的正确性。
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<ReferralStatsDto>>> {
    let user_id = claims.user_id()?;
    let cache_key = CacheKey::referral_stats(user_id);

    match state.cache.get::<ReferralStatsDto>(&cache_key).await {
        Ok(Some(cached)) => {
            debug!(user_id, "推荐统计缓存命中");
            return Ok(Json(ApiResponse::success(cached)));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "推荐统计缓存读取失败，回退数据库"),
    }

    let user: Option<(String, bool, String)> = sqlx::query_as(
        "SELECT referral_code, refund_eligible, refund_status FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?;
    let Some((referral_code, refund_eligible, refund_status)) = user else {
        return Err(ApiError::UserNotFound(user_id.to_string()));
    };

    let (total, completed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'completed')
        FROM referrals
        WHERE referrer_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;

    let dto = ReferralStatsDto {
        referral_code,
        total_referrals: total,
        completed_referrals: completed,
        refund_threshold: state.referral_config.refund_threshold,
        refund_eligible,
        refund_status,
    };

    let ttl = Duration::from_secs(state.referral_config.stats_cache_ttl_seconds);
    if let Err(e) = state.cache.set(&cache_key, &dto, ttl).await {
        debug!(error = %e, "推荐统计缓存写入失败");
    }

    Ok(Json(ApiResponse::success(dto)))
}

/// 自助申请退款
///
/// POST /api/referrals/request-refund
///
/// 仅 refund_status = eligible 的用户可以发起；并发请求通过条件
/// 更新裁决，只有一个会真正触发网关退款。
pub async fn request_refund(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<RefundResponse>>> {
    let user_id = claims.user_id()?;

    let outcome = refund::process_refund(
        &state.pool,
        &state.gateway,
        &state.gateway_config.currency,
        user_id,
        RefundPath::SelfService,
    )
    .await?;

    // 统计响应中的 refund_status 已变化，清除缓存
    if let Err(e) = state
        .cache
        .delete(&CacheKey::referral_stats(user_id))
        .await
    {
        debug!(error = %e, "推荐统计缓存清除失败");
    }

    info!(user_id, refund_id = %outcome.refund_id, "自助退款已发放");
    Ok(Json(ApiResponse::success(RefundResponse {
        refund_id: outcome.refund_id,
        amount: outcome.amount,
        refund_status: "issued".to_string(),
    })))
}
