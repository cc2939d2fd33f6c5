//! JWT Token 处理
//!
//! 提供凭证 Token 的签发和验证功能。Token 通过 HTTP-only Cookie 携带，
//! 验证失败一律视为「未认证」，调用方不得将其作为内部错误向上传播。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// 凭证 Token 在 Cookie 中的名称
pub const TOKEN_COOKIE: &str = "notehub_token";

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "notehub-secret-key-change-in-production".to_string(),
            expires_in_secs: 7 * 24 * 3600, // 7 天
            issuer: "notehub-api-service".to_string(),
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 用户邮箱
    pub email: String,
    /// 用户角色（free / paid / admin）
    pub role: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 解析用户 ID
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::Internal("无效的用户 ID".to_string()))
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成凭证 Token
    pub fn generate_token(
        &self,
        user_id: i64,
        email: &str,
        role: &str,
    ) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析凭证 Token
    ///
    /// 任何失败（签名被篡改、过期、格式错误）都返回 Unauthorized，
    /// 语义是「未认证」而非内部错误。
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }

    /// 获取 Token 过期时间（秒）
    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let config = JwtConfig::default();
        let manager = JwtManager::new(config);

        let (token, _exp) = manager
            .generate_token(1, "student@campus.edu", "free")
            .unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.email, "student@campus.edu");
        assert_eq!(claims.role, "free");
        assert_eq!(claims.user_id().unwrap(), 1);
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::default();
        let manager = JwtManager::new(config);

        let result = manager.verify_token("invalid.token.here");
        assert!(result.is_err());
    }

    /// 签名被篡改一个字节后必须验证失败
    #[test]
    fn test_tampered_signature_rejected() {
        let manager = JwtManager::new(JwtConfig::default());
        let (token, _) = manager.generate_token(7, "a@b.edu", "paid").unwrap();

        // 翻转签名段的最后一个字符
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(manager.verify_token(&tampered).is_err());
    }

    /// 不同密钥签发的 Token 不能互相验证
    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new(JwtConfig {
            secret: "secret-a".to_string(),
            ..Default::default()
        });
        let verifier = JwtManager::new(JwtConfig {
            secret: "secret-b".to_string(),
            ..Default::default()
        });

        let (token, _) = issuer.generate_token(1, "a@b.edu", "free").unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    /// 过期 Token 必须被拒绝
    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new(JwtConfig {
            expires_in_secs: -60,
            ..Default::default()
        });
        let (token, _) = manager.generate_token(1, "a@b.edu", "free").unwrap();
        let err = manager.verify_token(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
