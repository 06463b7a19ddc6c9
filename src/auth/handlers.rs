use axum::{extract::State, http::StatusCode, routing::post, Router};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, LoginResponse, RegisterRequest},
    error::AppResult,
    response::{reply, ApiResponse, Reply},
    state::AppState,
    users::model::UserView,
    validation::ValidatedJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserView),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed"),
    )
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Reply<UserView>> {
    let user = state
        .users
        .register(payload.name, payload.email, payload.password)
        .await?;
    Ok(reply(
        StatusCode::CREATED,
        ApiResponse::ok("User registered successfully", user),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account is not active"),
        (status = 422, description = "Validation failed"),
    )
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Reply<LoginResponse>> {
    let (token, user) = state.users.login(&payload.email, payload.password).await?;
    Ok(reply(
        StatusCode::OK,
        ApiResponse::ok("Login successful", LoginResponse { token, user }),
    ))
}
