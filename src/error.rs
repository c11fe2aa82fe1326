use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::response::ApiResponse;
use crate::service::ServiceError;

/// 对客户端隐藏内部细节时使用的统一提示
/// Message shown to clients in place of internal details
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// HTTP 边界上的统一错误类型
/// Unified error type at the HTTP boundary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("请求冲突: {0}")]
    Conflict(String),

    #[error("验证错误: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("请求错误: {0}")]
    BadRequest(String),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::BadRequest(message.into())
    }

    /// 客户端可见的消息；内部错误只返回通用提示
    /// Client-facing message; internal errors only expose the generic text
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::BadRequest(msg) => {
                msg.clone()
            }
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Validation(errors) => AppError::Validation(errors),
            ServiceError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::from(errors).into()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Validation(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // 记录错误日志
        match self {
            AppError::Internal(e) => tracing::error!(error = ?e, "Internal error"),
            _ => tracing::info!("Client error: {}", self),
        }

        let errors = match self {
            AppError::Validation(errors) => errors.clone(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code())
            .json(ApiResponse::<()>::error(self.public_message(), errors))
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Validation(vec!["bad".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ServiceError::Store(anyhow::anyhow!("pool timed out"))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::Internal(anyhow::anyhow!("password authentication failed"));
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], GENERIC_ERROR_MESSAGE);
        assert!(!String::from_utf8_lossy(&body).contains("password"));
    }

    #[actix_web::test]
    async fn test_validation_errors_listed() {
        let err = AppError::Validation(vec!["Invalid email format".into()]);
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"][0], "Invalid email format");
    }
}
