//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use notehub_shared::cache::Cache;
use notehub_shared::config::{GatewayConfig, ReferralConfig};
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::JwtManager;
use crate::gateway::PaymentGateway;
use crate::mailer::Mailer;

/// Axum 应用共享状态
///
/// 通过 Clone 在 handler 间共享，内部组件自身是 Clone 或 Arc 包裹
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端（仅加速读取，不承载正确性）
    pub cache: Arc<Cache>,
    /// JWT 管理器
    pub jwt_manager: JwtManager,
    /// 支付网关客户端
    pub gateway: PaymentGateway,
    /// 邮件发送器
    pub mailer: Mailer,
    /// 网关业务配置（金额边界与币种）
    pub gateway_config: GatewayConfig,
    /// 推荐配置（退款阈值与统计缓存 TTL）
    pub referral_config: ReferralConfig,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        pool: PgPool,
        cache: Arc<Cache>,
        jwt_manager: JwtManager,
        gateway: PaymentGateway,
        mailer: Mailer,
        gateway_config: GatewayConfig,
        referral_config: ReferralConfig,
    ) -> Self {
        Self {
            pool,
            cache,
            jwt_manager,
            gateway,
            mailer,
            gateway_config,
            referral_config,
        }
    }
}
