//! 认证模块
//!
//! 包含 JWT、密码处理和推荐码生成

pub mod jwt;
pub mod password;
pub mod referral_code;

pub use jwt::{Claims, JwtConfig, JwtManager, TOKEN_COOKIE};
pub use password::{hash_password, verify_password};
pub use referral_code::generate_referral_code;
