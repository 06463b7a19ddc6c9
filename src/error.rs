use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{auth::jwt::AuthError, response::ApiResponse};

/// Errors surfaced to HTTP clients. Only this type decides status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader => AppError::Unauthorized("Authorization header is required".into()),
            AuthError::InvalidScheme => {
                AppError::Unauthorized("Invalid authorization header format".into())
            }
            AuthError::Expired | AuthError::InvalidSignature | AuthError::Invalid => {
                AppError::Unauthorized("Invalid or expired token".into())
            }
            AuthError::Signing(e) => AppError::Internal(anyhow::Error::new(e).context("sign token")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(fields) => ApiResponse::failure(
                "Validation failed",
                serde_json::to_value(fields).ok(),
            ),
            AppError::Internal(err) => {
                error!(error = ?err, "internal error");
                ApiResponse::failure("Internal server error", None)
            }
            other => ApiResponse::failure(other.to_string(), None),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn classified_errors_keep_their_message() {
        let (status, json) = body_json(AppError::Conflict("email already registered".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "email already registered");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let err = AppError::from(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn validation_errors_carry_field_map() {
        let mut fields = BTreeMap::new();
        fields.insert("email".to_string(), "Invalid email format".to_string());
        let (status, json) = body_json(AppError::Validation(fields)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["email"], "Invalid email format");
    }
}
