// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP endpoints: Prometheus metrics, published outputs and liveness.

use crate::constants::{HEALTHZ_SERVER_PATH, METRICS_SERVER_PATH, OUTPUTS_SERVER_PATH};
use crate::metrics::gather_metrics;
use crate::outputs::Outputs;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
struct ServerState {
    outputs: watch::Receiver<Option<Arc<Outputs>>>,
}

/// Build the router.
pub fn router(outputs: watch::Receiver<Option<Arc<Outputs>>>) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(OUTPUTS_SERVER_PATH, get(outputs_handler))
        .route(HEALTHZ_SERVER_PATH, get(|| async { "ok" }))
        .with_state(ServerState { outputs })
}

async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn outputs_handler(State(state): State<ServerState>) -> Response {
    let current = state.outputs.borrow().clone();
    match current {
        Some(outputs) => Json(outputs.as_ref().clone()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "zone has not converged yet" })),
        )
            .into_response(),
    }
}

/// Serve `router` on `listener` until `shutdown` turns true.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
