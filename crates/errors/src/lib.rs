//! cuba-errors - 统一错误处理
//!
//! 登录防护只在存储层产生错误，上层一律降级处理，不会暴露给终端用户

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// 指标标签 `error` 的取值
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external_service",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::database("connection refused");
        assert_eq!(err.to_string(), "Database error: connection refused");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AppError::database("down").kind(), "database");
        assert_eq!(AppError::external_service("timeout").kind(), "external_service");
        assert_eq!(AppError::validation("bad key").kind(), "validation");
    }

    #[test]
    fn test_serialization_conversion() {
        let json_err = serde_json::from_str::<u32>("not-a-number").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
        assert_eq!(err.kind(), "serialization");
    }
}
