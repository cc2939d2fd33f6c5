//! 支付网关客户端
//!
//! 封装外部支付网关的下单、退款 API 调用与回调签名验证。
//! 签名算法：HMAC-SHA256("{order_id}|{payment_id}", key_secret) 的十六进制编码。

use hmac::{Hmac, Mac};
use notehub_shared::config::GatewayConfig;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{info, instrument};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// 网关下单响应
#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    /// 网关侧订单 ID
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// 网关退款响应
#[derive(Debug, Deserialize)]
pub struct GatewayRefund {
    /// 网关侧退款 ID
    pub id: String,
    pub amount: i64,
}

/// 支付网关客户端
#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentGateway {
    /// 创建网关客户端
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// 在网关侧创建订单
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ApiError> {
        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| ApiError::Gateway(format!("下单请求失败: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Gateway(format!(
                "下单被网关拒绝: HTTP {}",
                response.status()
            )));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| ApiError::Gateway(format!("下单响应解析失败: {}", e)))?;

        info!(gateway_order_id = %order.id, amount, "Gateway order created");
        Ok(order)
    }

    /// 对指定支付发起退款
    #[instrument(skip(self))]
    pub async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, ApiError> {
        let response = self
            .http
            .post(format!("{}/payments/{}/refund", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(|e| ApiError::Gateway(format!("退款请求失败: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Gateway(format!(
                "退款被网关拒绝: HTTP {}",
                response.status()
            )));
        }

        let refund: GatewayRefund = response
            .json()
            .await
            .map_err(|e| ApiError::Gateway(format!("退款响应解析失败: {}", e)))?;

        info!(refund_id = %refund.id, payment_id, amount, "Gateway refund issued");
        Ok(refund)
    }

    /// 验证网关回调签名
    ///
    /// 对 "{order_id}|{payment_id}" 重新计算 HMAC 并与回调携带的签名做
    /// 常量时间比较。任何不一致（包括签名不是合法十六进制）都返回 false，
    /// 绝不抛出错误。
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(self.key_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());

        // verify_slice 内部为常量时间比较
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway() -> PaymentGateway {
        PaymentGateway::new(&GatewayConfig {
            key_id: "key_test".to_string(),
            key_secret: "secret_test_123".to_string(),
            ..Default::default()
        })
    }

    /// 用同一密钥独立计算签名
    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let gateway = test_gateway();
        let signature = sign("secret_test_123", "order_1", "pay_1");
        assert!(gateway.verify_signature("order_1", "pay_1", &signature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let gateway = test_gateway();
        let signature = sign("another_secret", "order_1", "pay_1");
        assert!(!gateway.verify_signature("order_1", "pay_1", &signature));
    }

    /// 签名对应的不是同一组 (order, payment) 时必须拒绝
    #[test]
    fn test_mismatched_ids_rejected() {
        let gateway = test_gateway();
        let signature = sign("secret_test_123", "order_1", "pay_1");
        assert!(!gateway.verify_signature("order_2", "pay_1", &signature));
        assert!(!gateway.verify_signature("order_1", "pay_2", &signature));
    }

    /// 篡改签名任意一个字节必须拒绝
    #[test]
    fn test_tampered_signature_rejected() {
        let gateway = test_gateway();
        let mut signature = sign("secret_test_123", "order_1", "pay_1");
        let last = signature.pop().unwrap();
        signature.push(if last == 'a' { 'b' } else { 'a' });
        assert!(!gateway.verify_signature("order_1", "pay_1", &signature));
    }

    /// 非法十六进制签名按验证失败处理，不报错
    #[test]
    fn test_malformed_signature_rejected() {
        let gateway = test_gateway();
        assert!(!gateway.verify_signature("order_1", "pay_1", "not-hex!"));
        assert!(!gateway.verify_signature("order_1", "pay_1", ""));
    }
}
