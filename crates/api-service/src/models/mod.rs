//! 实体模型模块

pub mod catalog;
pub mod notification;
pub mod payment;
pub mod referral;
pub mod user;

pub use catalog::{NoteRow, ReviewDto, ReviewRow, TeacherRow};
pub use notification::{AuditLogRow, NotificationDto, NotificationRow, actions};
pub use payment::{OrderDto, OrderStatus, PaymentOrderRow};
pub use referral::{ReferralRow, ReferralStatsDto, ReferralStatus};
pub use user::{RefundStatus, UserDto, UserRole, UserRow};
