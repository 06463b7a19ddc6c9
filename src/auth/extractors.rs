use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::jwt::{AuthError, Identity};
use crate::error::AppError;

/// The caller identity attached by the bearer gate.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AuthError::MissingHeader.into())
    }
}
