//! 学生笔记平台 API 服务
//!
//! 提供笔记分享、讲师点评、会员支付、推荐返现等 REST API。
//!
//! ## 核心功能
//!
//! - **认证**：注册、登录，凭证 Token 通过 HTTP-only Cookie 下发
//! - **支付**：下单与网关回调结算，结算在单事务内完成全部下游效果
//! - **推荐**：注册时登记推荐关系，付费结算时记账并检查退款资格
//! - **退款**：自助与管理员两条路径共用一套前进式状态机
//! - **内容目录**：讲师、点评与笔记的查询与录入
//! - **通知与审计**：用户通知和特权操作的只追加审计日志
//!
//! ## 模块结构
//!
//! - `auth`: JWT、密码哈希和推荐码生成
//! - `dto`: 统一响应包裹与分页参数
//! - `models`: 实体模型与状态机定义
//! - `gateway`: 支付网关客户端与签名验证
//! - `settlement`: 回调结算事务
//! - `referral` / `refund`: 推荐账本与退款处理器
//! - `notify` / `audit` / `mailer`: 通知、审计与邮件侧写
//! - `handlers` / `routes` / `middleware`: HTTP 层
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod audit;
pub mod auth;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod referral;
pub mod refund;
pub mod routes;
pub mod settlement;
pub mod state;

// 重新导出核心类型
pub use dto::{ApiResponse, PageResponse, PaginationParams};
pub use error::{ApiError, Result};
pub use models::{
    OrderStatus, ReferralStatsDto, ReferralStatus, RefundStatus, UserDto, UserRole,
};
