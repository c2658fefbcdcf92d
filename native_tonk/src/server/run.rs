// Router construction and server startup.

use std::net::SocketAddr;

use axum::{routing::get, routing::post, Json, Router};
use tower_http::trace::TraceLayer;

use anyhow::{Context, Result};

use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "ok": true })) }),
        )
        .route("/ws", get(super::ws::ws_handler))
        .route("/api/message", post(super::http::message_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);

    tracing::info!(%addr, "tonk server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
