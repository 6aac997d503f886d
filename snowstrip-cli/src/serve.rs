//! Request-triggered mode: every `GET /` renders a fresh strip and answers with
//! the base64-encoded PNG.

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use snowstrip_core::Pipeline;
use tracing::{error, info};

pub struct ServerState {
    pipeline: Pipeline,
    clock: fn() -> DateTime<Utc>,
}

impl ServerState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline, clock: Utc::now }
    }

    #[cfg(test)]
    fn with_clock(pipeline: Pipeline, clock: fn() -> DateTime<Utc>) -> Self {
        Self { pipeline, clock }
    }
}

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(strip_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}

/// GET / - render the strip
async fn strip_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    let now = (state.clock)();

    match state.pipeline.render_png(&now).await {
        Ok(png) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            STANDARD.encode(png),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /health
async fn health_handler() -> &'static str {
    "ok"
}

pub async fn run_server(state: Arc<ServerState>, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = addr, "Starting strip server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
