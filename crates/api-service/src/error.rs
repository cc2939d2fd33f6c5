//! 平台服务错误类型定义
//!
//! 包含所有 API 服务特有的错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 平台服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("邮箱或密码错误")]
    InvalidCredentials,

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("无效的订单金额: {0}")]
    InvalidAmount(i64),
    #[error("账户已是付费会员")]
    AlreadyPremium,
    #[error("支付签名验证失败")]
    InvalidSignature,

    // 资源不存在
    #[error("用户不存在: {0}")]
    UserNotFound(String),
    #[error("订单不存在: {0}")]
    OrderNotFound(String),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务冲突
    #[error("邮箱已被注册: {0}")]
    EmailTaken(String),
    #[error("讲师已存在: {name} ({department})")]
    DuplicateTeacher { name: String, department: String },
    #[error("当前状态不满足退款条件")]
    NotEligible,

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis错误: {0}")]
    Redis(String),
    #[error("支付网关错误: {0}")]
    Gateway(String),
    #[error("邮件服务错误: {0}")]
    Mail(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            Self::Validation(_)
            | Self::InvalidAmount(_)
            | Self::AlreadyPremium
            | Self::InvalidSignature => StatusCode::BAD_REQUEST,

            Self::UserNotFound(_) | Self::OrderNotFound(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }

            Self::EmailTaken(_) | Self::DuplicateTeacher { .. } | Self::NotEligible => {
                StatusCode::CONFLICT
            }

            Self::Database(_)
            | Self::Redis(_)
            | Self::Gateway(_)
            | Self::Mail(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AlreadyPremium => "ALREADY_PREMIUM",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::DuplicateTeacher { .. } => "DUPLICATE_TEACHER",
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Mail(_) => "MAIL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Redis(e) => {
                tracing::error!(error = %e, "Redis 操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Gateway(e) => {
                tracing::error!(error = %e, "支付网关调用失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Mail(e) => {
                tracing::error!(error = %e, "邮件发送失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 从共享层错误转换
impl From<notehub_shared::error::SharedError> for ApiError {
    fn from(err: notehub_shared::error::SharedError) -> Self {
        use notehub_shared::error::SharedError;
        match err {
            SharedError::Database(e) => Self::Database(e),
            SharedError::Redis(e) => Self::Redis(e.to_string()),
            SharedError::NotFound { entity, id } => Self::NotFound(format!("{} {}", entity, id)),
            SharedError::Validation(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// 构造所有错误变体及其期望的 (StatusCode, error_code) 映射。
    /// 使用表驱动方式避免逐个变体写重复断言，同时保证新增变体时只需在一处维护。
    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            // 认证 & 权限类
            (ApiError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Forbidden("admin only".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            // 参数校验与支付前置条件
            (ApiError::Validation("email is required".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ApiError::InvalidAmount(-5), StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            (ApiError::AlreadyPremium, StatusCode::BAD_REQUEST, "ALREADY_PREMIUM"),
            (ApiError::InvalidSignature, StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            // 资源不存在类
            (ApiError::UserNotFound("42".into()), StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            (ApiError::OrderNotFound("order_x".into()), StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            (ApiError::NotFound("notification 7".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            // 业务冲突类：409 表示请求合法但与当前状态冲突
            (ApiError::EmailTaken("a@b.edu".into()), StatusCode::CONFLICT, "EMAIL_TAKEN"),
            (
                ApiError::DuplicateTeacher { name: "Rao".into(), department: "CSE".into() },
                StatusCode::CONFLICT,
                "DUPLICATE_TEACHER",
            ),
            (ApiError::NotEligible, StatusCode::CONFLICT, "NOT_ELIGIBLE"),
            // 系统级错误：统一 500，防止内部实现细节泄露
            (ApiError::Redis("connection refused".into()), StatusCode::INTERNAL_SERVER_ERROR, "REDIS_ERROR"),
            (ApiError::Gateway("timeout".into()), StatusCode::INTERNAL_SERVER_ERROR, "GATEWAY_ERROR"),
            (ApiError::Mail("401 from provider".into()), StatusCode::INTERNAL_SERVER_ERROR, "MAIL_ERROR"),
            (ApiError::Internal("unexpected state".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    /// 确保每个错误变体都映射到正确的 HTTP 状态码。
    /// 状态码错误会导致前端误判请求结果（如把 409 当 500 处理），所以需要逐一验证。
    #[test]
    fn test_all_variants_status_code() {
        for (error, expected_status, label) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "状态码不匹配: variant={label}"
            );
        }
    }

    /// 错误码是 API 契约的一部分，客户端用它做条件分支。
    /// 任何错误码变更都是破坏性变更，必须逐一锁定。
    #[test]
    fn test_all_variants_error_code() {
        for (error, _status, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "错误码不匹配: expected={expected_code}"
            );
        }
    }

    /// Display 输出直接作为 API 响应的 message 字段返回给用户，
    /// 必须包含关键上下文（如 ID、邮箱），否则用户无法定位问题。
    #[test]
    fn test_display_contains_context() {
        assert!(ApiError::Unauthorized("expired".into()).to_string().contains("expired"));
        assert!(ApiError::UserNotFound("42".into()).to_string().contains("42"));
        assert!(ApiError::EmailTaken("a@b.edu".into()).to_string().contains("a@b.edu"));
        assert!(ApiError::InvalidAmount(-5).to_string().contains("-5"));
        assert!(
            ApiError::DuplicateTeacher { name: "Rao".into(), department: "CSE".into() }
                .to_string()
                .contains("Rao")
        );
    }

    /// IntoResponse 是错误到 HTTP 响应的最终出口。
    /// 必须验证：状态码正确、响应体结构完整（success/code/message/data 四字段）。
    #[tokio::test]
    async fn test_into_response_body_structure() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let label = format!("{:?}", error);
            let response = error.into_response();

            assert_eq!(
                response.status(),
                expected_status,
                "响应状态码不匹配: {label}"
            );

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

            assert_eq!(body["success"], json!(false), "success 字段应为 false: {label}");
            assert_eq!(body["code"], json!(expected_code), "code 字段不匹配: {label}");
            assert!(!body["message"].as_str().unwrap_or("").is_empty(), "message 不应为空: {label}");
            assert!(body["data"].is_null(), "data 字段应为 null: {label}");
        }
    }

    /// 系统级错误（Database/Redis/Gateway/Mail/Internal）的响应消息不应泄露内部细节。
    /// 这是安全要求，防止攻击者通过错误消息探测系统架构。
    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let system_errors: Vec<(ApiError, &str)> = vec![
            (ApiError::Redis("redis://10.0.0.1:6379 connection refused".into()), "redis://10.0.0.1:6379"),
            (ApiError::Gateway("key_id rzp_live_x rejected".into()), "rzp_live_x"),
            (ApiError::Mail("smtp password invalid".into()), "smtp password"),
            (ApiError::Internal("stack overflow at module X".into()), "stack overflow"),
        ];

        for (error, leaked_detail) in system_errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            assert!(
                !message.contains(leaked_detail),
                "系统错误消息泄露了内部细节: message={message}, leaked={leaked_detail}"
            );
            assert!(
                message.contains("服务内部错误"),
                "系统错误应返回通用提示，实际: {message}"
            );
        }
    }

    /// validator 是请求参数校验的统一入口，转换必须把字段级错误信息带入 ApiError。
    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("email");
        field_error.message = Some("邮箱格式不正确".into());
        errors.add("email", field_error);

        let api_error: ApiError = errors.into();
        match &api_error {
            ApiError::Validation(msg) => {
                assert!(msg.contains("email"), "转换后应保留字段名: {msg}");
            }
            other => panic!("期望 Validation 变体，实际: {:?}", other),
        }

        assert_eq!(api_error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error_code(), "VALIDATION_ERROR");
    }

    /// sqlx::Error 通过 #[from] 自动派生 From，验证转换后类型和状态码正确
    #[test]
    fn test_from_sqlx_error() {
        let sqlx_err = sqlx::Error::RowNotFound;
        let api_err = ApiError::from(sqlx_err);
        assert!(matches!(api_err, ApiError::Database(_)));
        assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_err.error_code(), "DATABASE_ERROR");
    }

    /// 共享层错误的映射决定了基础设施故障如何呈现给客户端。
    #[test]
    fn test_from_shared_error() {
        use notehub_shared::error::SharedError;

        let err: ApiError = SharedError::NotFound {
            entity: "Teacher".to_string(),
            id: "9".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = SharedError::Validation("bad input".to_string()).into();
        assert!(matches!(err, ApiError::Validation(_)));

        let err: ApiError = SharedError::Internal("boom".to_string()).into();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
