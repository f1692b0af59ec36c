//! 配额服务错误类型定义
//!
//! 所有操作的失败都归入这套分类，作为结构化结果返回给调用方，
//! 不向外透出原始内部错误。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use liuren_shared::error::StoreError;
use serde_json::json;

/// 配额服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    // 输入与鉴权错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("密码错误")]
    Unauthorized,
    #[error("管理密码错误")]
    Forbidden,

    // 账本状态错误
    #[error("起卦码不存在: {0}")]
    CodeNotFound(String),
    #[error("起卦码已过期: {0}")]
    Expired(String),
    #[error("起卦次数已用完: {0}")]
    QuotaExhausted(String),
    #[error("操作冲突，请稍后重试: {0}")]
    Contention(String),

    // 签发错误
    #[error("无法生成唯一起卦码（已尝试 {0} 次）")]
    GenerationExhausted(u32),

    // 支付网关错误
    #[error("付款未完成: 状态 {0}")]
    PaymentNotCompleted(String),
    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },
    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // 系统错误
    #[error("存储服务不可用: {0}")]
    StoreUnavailable(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl QuotaError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::CodeNotFound(_) => StatusCode::NOT_FOUND,
            // 过期与不存在是两种用户可见的不同结果
            Self::Expired(_) => StatusCode::FORBIDDEN,
            Self::QuotaExhausted(_) | Self::Contention(_) => StatusCode::CONFLICT,
            Self::PaymentNotCompleted(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            Self::ExternalServiceTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::GenerationExhausted(_) | Self::StoreUnavailable(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::CodeNotFound(_) => "CODE_NOT_FOUND",
            Self::Expired(_) => "CODE_EXPIRED",
            Self::QuotaExhausted(_) => "QUOTA_EXHAUSTED",
            Self::Contention(_) => "CONTENTION",
            Self::GenerationExhausted(_) => "GENERATION_EXHAUSTED",
            Self::PaymentNotCompleted(_) => "PAYMENT_NOT_COMPLETED",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for QuotaError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::StoreUnavailable(e) => {
                tracing::error!(error = %e, "存储操作失败");
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
impl From<validator::ValidationErrors> for QuotaError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从存储层错误转换
///
/// 瞬时存储故障映射到 StoreUnavailable；序列化失败属于数据损坏，
/// 归入内部错误。
impl From<StoreError> for QuotaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Redis(e) => Self::StoreUnavailable(e.to_string()),
            StoreError::Timeout(msg) => Self::StoreUnavailable(msg),
            StoreError::Serialization(msg) | StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, QuotaError>;
