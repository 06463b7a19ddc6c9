use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Router,
};

use super::{
    dto::{PageQuery, Pagination, SetStatusRequest, UpdateUserRequest},
    model::UserView,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    response::{reply, ApiResponse, Reply},
    state::AppState,
    validation::ValidatedJson,
};

/// Routes for authenticated callers. The bearer gate is layered on by the app.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me))
        .route("/users", get(list))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Routes that additionally require the `admin` role.
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/admin/users/:id/status", put(set_status))
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile of the caller", body = UserView),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn me(State(state): State<AppState>, AuthUser(identity): AuthUser) -> AppResult<Reply<UserView>> {
    let user = state.users.get_by_id(identity.user_id).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("User retrieved successfully", user),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(PageQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of users with pagination meta", body = [UserView]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Reply<Vec<UserView>>> {
    let (users, meta) = state.users.list(Pagination::from(&query)).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("Users retrieved successfully", users).with_meta(meta),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserView),
        (status = 400, description = "Invalid user ID"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Reply<UserView>> {
    let user = state.users.get_by_id(parse_id(&id)?).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("User retrieved successfully", user),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already taken"),
        (status = 422, description = "Validation failed"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Reply<UserView>> {
    let user = state.users.update(parse_id(&id)?, body).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("User updated successfully", user),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Reply<()>> {
    state.users.delete(parse_id(&id)?).await?;
    Ok(reply(StatusCode::OK, ApiResponse::message("User deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    request_body = SetStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Activation changed", body = UserView),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SetStatusRequest>,
) -> AppResult<Reply<UserView>> {
    let user = state.users.set_active(parse_id(&id)?, body.is_active).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("User status updated successfully", user),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_ids_are_bad_requests() {
        assert_eq!(parse_id("42").unwrap(), 42);
        let err = parse_id("abc").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid user ID");
    }
}
