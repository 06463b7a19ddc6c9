use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    auth::{self, dto as auth_dto},
    health,
    response::Meta,
    state::AppState,
    users::{self, dto as users_dto, model::UserView},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "User API", description = "Registration, login and user management"),
    paths(
        auth::handlers::register,
        auth::handlers::login,
        users::handlers::me,
        users::handlers::list,
        users::handlers::get_user,
        users::handlers::update_user,
        users::handlers::delete_user,
        users::handlers::set_status,
        health::health,
        health::ready,
    ),
    components(schemas(
        UserView,
        Meta,
        auth_dto::RegisterRequest,
        auth_dto::LoginRequest,
        auth_dto::LoginResponse,
        users_dto::UpdateUserRequest,
        users_dto::SetStatusRequest,
        health::Health,
        health::Readiness,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "User management"),
        (name = "admin", description = "Admin-only operations"),
        (name = "health", description = "Liveness and readiness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_bearer_scheme() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/api/v1/auth/register",
            "/api/v1/auth/login",
            "/api/v1/users/me",
            "/api/v1/users",
            "/api/v1/users/{id}",
            "/api/v1/admin/users/{id}/status",
            "/health",
            "/ready",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert_eq!(
            doc["components"]["securitySchemes"]["bearer_auth"]["scheme"],
            "bearer"
        );
    }
}
