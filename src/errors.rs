use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("team {0} is not registered")]
    NotRegistered(String),

    #[error("no users registered for team {0}")]
    NoUsers(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("verification token mismatch")]
    AuthMismatch,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Remote(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Storage(sqlx::Error::Migrate(Box::new(e)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, msg) = match &self {
            AppError::AuthMismatch => (
                StatusCode::FORBIDDEN,
                "authentication_error",
                "Token mismatch".to_string(),
            ),
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                reason.clone(),
            ),
            AppError::NotRegistered(_) | AppError::NoUsers(_) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                self.to_string(),
            ),
            AppError::Remote(e) => {
                tracing::warn!("Remote error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "upstream request failed".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mismatch_is_forbidden() {
        let resp = AppError::AuthMismatch.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let resp = AppError::Validation("bad json".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_remote_error_does_not_leak_details() {
        let err = AppError::Remote("token abc rejected".into());
        assert_eq!(err.to_string(), "remote error: token abc rejected");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
