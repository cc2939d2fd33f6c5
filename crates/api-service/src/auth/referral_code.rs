//! 推荐码生成
//!
//! 生成短小、可口头分享的大写字母数字推荐码。
//! 唯一性由 users.referral_code 的唯一索引保证，发生冲突时
//! 由注册流程重新生成并重试（见 handlers::auth::register）。

use rand::Rng;

/// 推荐码长度
pub const CODE_LEN: usize = 8;

/// 候选字符集：去掉易混淆的 0/O/1/I
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成一个推荐码
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CHARSET.contains(&b)));
    }

    /// 字符集排除了易混淆字符
    #[test]
    fn test_no_ambiguous_chars() {
        for _ in 0..100 {
            let code = generate_referral_code();
            assert!(!code.contains('0'));
            assert!(!code.contains('O'));
            assert!(!code.contains('1'));
            assert!(!code.contains('I'));
        }
    }

    /// 两次生成撞码的概率约为 32^-8，连续相等视为实现错误
    #[test]
    fn test_codes_vary() {
        let a = generate_referral_code();
        let b = generate_referral_code();
        assert_ne!(a, b);
    }
}
