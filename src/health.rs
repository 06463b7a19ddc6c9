use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    response::{reply, ApiResponse, Reply},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Readiness {
    pub status: String,
    pub database: String,
    pub cache: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = Health))
)]
pub async fn health() -> Reply<Health> {
    reply(
        StatusCode::OK,
        ApiResponse::ok(
            "Service is running",
            Health {
                status: "healthy".into(),
            },
        ),
    )
}

/// The store decides readiness; the cache is only reported.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Dependencies reachable", body = Readiness),
        (status = 503, description = "Database unreachable", body = Readiness),
    )
)]
pub async fn ready(State(state): State<AppState>) -> Reply<Readiness> {
    let database = match state.store.ping().await {
        Ok(()) => "up",
        Err(e) => {
            warn!(error = %e, "readiness: database ping failed");
            "down"
        }
    };
    let cache = match &state.cache {
        None => "disabled",
        Some(cache) => match cache.ping().await {
            Ok(()) => "up",
            Err(e) => {
                warn!(error = %e, "readiness: cache ping failed");
                "down"
            }
        },
    };

    let readiness = Readiness {
        status: if database == "up" { "ready" } else { "not ready" }.into(),
        database: database.into(),
        cache: cache.into(),
    };
    if database == "up" {
        return reply(StatusCode::OK, ApiResponse::ok("Service is ready", readiness));
    }
    let mut body = ApiResponse::ok("Service is not ready", readiness);
    body.success = false;
    reply(StatusCode::SERVICE_UNAVAILABLE, body)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::password::Argon2Hasher,
        users::repo::{MockUserStore, StoreError},
    };

    #[tokio::test]
    async fn unreachable_database_is_not_ready() {
        let mut store = MockUserStore::new();
        store
            .expect_ping()
            .returning(|| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));
        let fake = AppState::fake();
        let state = AppState::from_parts(
            fake.config.clone(),
            Arc::new(store),
            Arc::new(Argon2Hasher),
            None,
            None,
        );

        let (status, axum::Json(body)) = ready(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.success);
        assert_eq!(body.message, "Service is not ready");
        let data = body.data.unwrap();
        assert_eq!(data.status, "not ready");
        assert_eq!(data.database, "down");
        assert_eq!(data.cache, "disabled");
    }
}
