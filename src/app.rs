use std::{any::Any, net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, Request, Response,
    },
    middleware::{from_fn, from_fn_with_state, map_response},
    response::IntoResponse,
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn, Span};

use crate::{
    auth::{
        self,
        middleware::{require_admin, require_auth},
    },
    config::ServerConfig,
    docs,
    error::AppError,
    health,
    response::ApiResponse,
    state::AppState,
    users,
};

pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.app.request_timeout_secs);

    let protected = users::router().route_layer(from_fn_with_state(state.clone(), require_auth));
    // Last route_layer runs first: authenticate, then check the role.
    let admin = users::admin_router()
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(protected)
                .merge(admin),
        )
        .merge(health::router())
        .merge(docs::router())
        .fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .layer(map_response(envelope_bare_errors))
        .layer(CatchPanicLayer::custom(catch_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_owned();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        request_id = %request_id,
                        status = tracing::field::Empty,
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    let latency_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        error!(%status, latency_ms, "response");
                    } else if status.is_client_error() {
                        warn!(%status, latency_ms, "response");
                    } else {
                        info!(%status, latency_ms, "response");
                    }
                }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn route_not_found() -> AppError {
    AppError::NotFound("route not found".into())
}

/// Error responses produced below the handlers (405 from the router, 408
/// from the timeout layer) carry no body; give them the standard envelope.
async fn envelope_bare_errors(res: axum::response::Response) -> axum::response::Response {
    let status = res.status();
    if !(status.is_client_error() || status.is_server_error())
        || res.headers().contains_key(CONTENT_TYPE)
    {
        return res;
    }
    let message = status.canonical_reason().unwrap_or("Request failed");
    let (mut parts, _) = res.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = Json(ApiResponse::failure(message, None))
        .into_response()
        .into_body();
    axum::response::Response::from_parts(parts, body)
}

fn catch_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "<unknown>".into()
    };
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

pub async fn serve(app: Router, cfg: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid APP_HOST/APP_PORT")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, env = %cfg.env, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn bare_timeout_gets_an_envelope() {
        let bare = axum::response::Response::builder()
            .status(StatusCode::REQUEST_TIMEOUT)
            .body(Body::empty())
            .unwrap();
        let res = envelope_bare_errors(bare).await;
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "Request Timeout" }));
    }

    #[tokio::test]
    async fn json_and_success_responses_pass_through() {
        let ok = axum::response::Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .unwrap();
        let res = envelope_bare_errors(ok).await;
        assert!(!res.headers().contains_key(CONTENT_TYPE));

        let res = envelope_bare_errors(AppError::NotFound("user not found".into()).into_response()).await;
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "user not found");
    }
}
