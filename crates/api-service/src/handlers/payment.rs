//! 支付相关的 HTTP 处理器
//!
//! 下单与回调结算。结算是整个平台唯一的多步状态变更：
//! 订单完成、账户升级、推荐记账、资格检查和通知写入在同一个
//! 数据库事务中提交，以 gateway_order_id 为幂等键，重复回调
//! 不产生额外效果。

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Claims;
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::{OrderDto, OrderStatus, UserRole};
use crate::notify::NotificationTemplate;
use crate::settlement::{self, SettlementOutcome};
use crate::state::AppState;
use notehub_shared::cache::CacheKey;

// ============================================
// 请求/响应 DTO
// ============================================

/// 下单请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// 金额（最小货币单位）
    pub amount: i64,
    /// 推荐码（可选，结算时才校验归属）
    #[validate(length(min = 1, max = 16, message = "推荐码格式不正确"))]
    pub referral_code: Option<String>,
}

/// 网关回调载荷
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "缺少网关订单 ID"))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, message = "缺少网关支付 ID"))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1, message = "缺少签名"))]
    pub signature: String,
}

/// 结算响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub order_status: String,
    pub role: String,
}

// ============================================
// API 处理器
// ============================================

/// 创建支付订单
///
/// POST /api/payment/create-order
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDto>>> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let bounds = &state.gateway_config;
    if req.amount < bounds.min_amount || req.amount > bounds.max_amount {
        return Err(ApiError::InvalidAmount(req.amount));
    }

    let role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::UserNotFound(user_id.to_string()))?;

    if role == UserRole::Paid.as_str() {
        return Err(ApiError::AlreadyPremium);
    }

    let receipt = format!("notehub-{}-{}", user_id, Uuid::new_v4().simple());
    let gateway_order = state
        .gateway
        .create_order(req.amount, &bounds.currency, &receipt)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO payment_orders (gateway_order_id, user_id, amount, currency, status, referral_code)
        VALUES ($1, $2, $3, $4, 'created', $5)
        "#,
    )
    .bind(&gateway_order.id)
    .bind(user_id)
    .bind(gateway_order.amount)
    .bind(&gateway_order.currency)
    .bind(&req.referral_code)
    .execute(&state.pool)
    .await?;

    info!(user_id, gateway_order_id = %gateway_order.id, amount = gateway_order.amount, "订单已创建");
    Ok(Json(ApiResponse::success(OrderDto {
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        currency: gateway_order.currency,
        status: OrderStatus::Created.as_str().to_string(),
    })))
}

/// 验证网关回调并结算
///
/// POST /api/payment/verify
///
/// 签名校验失败时不发生任何状态变更。签名通过后，所有下游效果
/// 在单个事务内提交；回调重放命中已完成订单时按幂等成功返回。
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>> {
    req.validate()?;
    let user_id = claims.user_id()?;

    if !state
        .gateway
        .verify_signature(&req.gateway_order_id, &req.gateway_payment_id, &req.signature)
    {
        warn!(user_id, gateway_order_id = %req.gateway_order_id, "回调签名验证失败");
        return Err(ApiError::InvalidSignature);
    }

    let outcome = settlement::settle_order(
        &state.pool,
        user_id,
        &req.gateway_order_id,
        &req.gateway_payment_id,
        state.referral_config.refund_threshold,
    )
    .await?;

    let (amount, currency, referrer_id) = match outcome {
        SettlementOutcome::Applied {
            amount,
            currency,
            referrer_id,
        } => (amount, currency, referrer_id),
        SettlementOutcome::Replayed { role } => {
            return Ok(Json(ApiResponse::success_with_message(
                SettlementResponse {
                    order_status: OrderStatus::Completed.as_str().to_string(),
                    role,
                },
                "订单已结算",
            )));
        }
    };

    // 推荐人的统计缓存已过期，提交后清除
    if let Some(referrer_id) = referrer_id {
        let cache = state.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.delete(&CacheKey::referral_stats(referrer_id)).await {
                warn!(error = %e, referrer_id, "推荐统计缓存清除失败");
            }
        });
    }

    // 邮件回执异步发送，失败不影响结算结果
    let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?;
    if let Some(email) = email {
        let mailer = state.mailer.clone();
        let pool = state.pool.clone();
        let body = NotificationTemplate::PaymentSuccess { amount, currency }.render_body();
        tokio::spawn(async move {
            mailer.send(&pool, user_id, &email, "支付回执", &body).await;
        });
    }

    Ok(Json(ApiResponse::success(SettlementResponse {
        order_status: OrderStatus::Completed.as_str().to_string(),
        role: UserRole::Paid.as_str().to_string(),
    })))
}
