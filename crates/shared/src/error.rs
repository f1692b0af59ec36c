//! 基础设施层错误类型
//!
//! 只覆盖存储适配层的失败类别；业务错误分类由服务 crate 自行定义。

use thiserror::Error;

/// 存储适配层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("存储操作超时: {0}")]
    Timeout(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redis(_) => "REDIS_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Timeout(_) => "STORE_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 只有瞬时故障（连接抖动、超时）可重试；序列化失败重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            StoreError::Serialization("bad json".into()).code(),
            "SERIALIZATION_ERROR"
        );
        assert_eq!(StoreError::Timeout("ping".into()).code(), "STORE_TIMEOUT");
        assert_eq!(StoreError::Internal("oops".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_is_retryable() {
        assert!(StoreError::Timeout("connect".into()).is_retryable());
        assert!(!StoreError::Serialization("bad".into()).is_retryable());
        assert!(!StoreError::Internal("oops".into()).is_retryable());
    }

    #[test]
    fn test_display_contains_context() {
        let err = StoreError::Timeout("GET quota:LR-TEST".into());
        assert!(err.to_string().contains("quota:LR-TEST"));
    }
}
