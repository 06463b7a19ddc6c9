use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::jwt::{AuthError, Identity};
use crate::{error::AppError, state::AppState, users::model::ROLE_ADMIN};

/// Rejects requests without a valid bearer token; on success the decoded
/// [`Identity`] is stored in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = {
        let token = bearer_token(req.headers())?;
        state.tokens.verify(token).map_err(|e| {
            warn!(error = %e, path = %req.uri().path(), "rejected bearer token");
            AppError::from(e)
        })?
    };
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    ensure_role(&req, ROLE_ADMIN)?;
    Ok(next.run(req).await)
}

fn ensure_role(req: &Request, expected: &str) -> Result<(), AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::from(AuthError::MissingHeader))?;
    if identity.role != expected {
        warn!(user_id = identity.user_id, role = %identity.role, expected, "role check failed");
        return Err(AppError::Forbidden("insufficient permissions".into()));
    }
    Ok(())
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthError::InvalidScheme)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}
