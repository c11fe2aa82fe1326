//! 统一响应信封 / Uniform response envelope

use actix_web::HttpResponse;
use serde::Serialize;

use crate::model::{Page, PaginationMetadata};

/// 所有接口共用的响应结构
/// `{success, message, data, errors, pagination}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMetadata>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message(data, "Success")
    }

    pub fn with_message<M: Into<String>>(data: T, message: M) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: Vec::new(),
            pagination: None,
        }
    }

    pub fn error<M: Into<String>>(message: M, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
            pagination: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paged(page: Page<T>) -> Self {
        let pagination = page.metadata();
        Self {
            success: true,
            message: "Success".to_string(),
            data: Some(page.items),
            errors: Vec::new(),
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<()> {
    pub fn message<M: Into<String>>(message: M) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            errors: Vec::new(),
            pagination: None,
        }
    }
}

/// 便捷函数：200 + 信封 / convenience: 200 with envelope
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::with_message(data, message))
}
