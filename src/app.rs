use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::{auth, config::AppConfig, state::AppState};

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        // The refresh cookie only crosses origins with credentials allowed.
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
                Method::HEAD,
            ]),
        None => CorsLayer::permissive(),
    }
}

fn request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        status = tracing::field::Empty,
    )
}

fn record_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    let latency_ms = latency.as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%status, latency_ms, "request failed");
    } else {
        tracing::debug!(%status, latency_ms, "request finished");
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "spendwise listening");
    axum::serve(listener, app).await.context("server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_served_under_api_prefix() {
        let (state, _) = AppState::fake();
        let res = build_app(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_origin_allows_credentials() {
        let (mut state, _) = AppState::fake();
        let mut config = (*state.config).clone();
        config.cors_origin = Some("https://app.spendwise.example".into());
        state.config = std::sync::Arc::new(config);

        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("origin", "https://app.spendwise.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = res.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "https://app.spendwise.example"
        );
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    }
}
