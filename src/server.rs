//! Exposition endpoint: renders the registry in the Prometheus text format.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(registry)
}

async fn index() -> Html<&'static str> {
    Html("<html><body><h1>upstat exporter</h1><p><a href=\"/metrics\">metrics</a></p></body></html>")
}

async fn metrics(State(registry): State<Registry>) -> Response {
    // gather() drives the collector's blocking upstream calls; keep them off
    // the runtime workers.
    let families = match tokio::task::spawn_blocking(move || registry.gather()).await {
        Ok(families) => families,
        Err(err) => {
            error!(error = %err, "metrics gather task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        error!(error = %err, "failed to encode metric families");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type())], buf).into_response()
}
