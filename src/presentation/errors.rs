// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::models::task::DomainError;
use crate::domain::repositories::task_repository::RepositoryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口。
/// HTTP 响应统一使用 `{"error": {"code": ..., "message": ...}}`
/// 信封。
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    /// 验证失败的便捷构造
    pub fn validation(message: impl Into<String>) -> Self {
        Self(DomainError::ValidationError(message.into()).into())
    }

    /// 记录未找到的便捷构造
    pub fn not_found() -> Self {
        Self(RepositoryError::NotFound.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let (status, code) = if let Some(repo_err) = self.0.downcast_ref::<RepositoryError>() {
            match repo_err {
                RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                RepositoryError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            }
        } else if let Some(domain_err) = self.0.downcast_ref::<DomainError>() {
            match domain_err {
                DomainError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                DomainError::InvalidStateTransition => (StatusCode::CONFLICT, "INVALID_STATE"),
            }
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": error_message,
            }
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
