//! 密码处理
//!
//! 提供密码哈希和验证功能

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::ApiError;

/// 对密码进行哈希处理
///
/// 使用 bcrypt 算法生成密码哈希（每次调用随机加盐）
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("密码哈希失败: {}", e)))
}

/// 验证密码
///
/// 比较明文密码与存储的哈希值。存储的哈希格式损坏时返回 false
/// 而不是错误：对登录方而言二者都只是「凭证不匹配」。
pub fn verify_password(password: &str, hashed: &str) -> bool {
    verify(password, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "test_password_123";
        let hashed = hash_password(password).unwrap();

        assert!(verify_password(password, &hashed));
        assert!(!verify_password("wrong_password", &hashed));
    }

    /// 同一密码的两次哈希因随机盐而不同，但都能通过验证
    #[test]
    fn test_random_salt() {
        let a = hash_password("p@ss").unwrap();
        let b = hash_password("p@ss").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("p@ss", &a));
        assert!(verify_password("p@ss", &b));
    }

    /// 格式损坏的哈希不报错，按不匹配处理
    #[test]
    fn test_malformed_hash_returns_false() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
        assert!(!verify_password("anything", ""));
    }
}
