use std::net::SocketAddr;

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, dashboard, device_tokens, groups, jobs, lessons, managers, materials, notifications,
    payments, state::AppState, students, trace,
};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(groups::router())
        .merge(students::router())
        .merge(lessons::router())
        .merge(materials::router())
        .merge(notifications::router())
        .merge(payments::router())
        .merge(device_tokens::router())
        .merge(managers::router())
        .merge(dashboard::router())
        .merge(jobs::router())
        .route("/health", get(health))
}

pub fn build_app(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    let routes = if prefix.is_empty() {
        api_routes()
    } else {
        Router::new().nest(&prefix, api_routes())
    };

    routes
        .with_state(state)
        .layer(middleware::from_fn(trace::propagate))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty,
                        trace_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
