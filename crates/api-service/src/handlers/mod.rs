//! HTTP 处理器模块

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod notification;
pub mod payment;
pub mod referral;
