//! HTTP entry point: `POST /webhook` into the pipeline, `GET /health` for probes.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use webhook::{WebhookPipeline, WebhookRequest};

/// Marks a body that the gateway in front of us delivered base64-encoded.
const BODY_ENCODING_HEADER: &str = "content-transfer-encoding";

pub fn build_router(pipeline: Arc<WebhookPipeline>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook(
    State(pipeline): State<Arc<WebhookPipeline>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let is_base64_encoded = headers
        .get(BODY_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("base64"));
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = WebhookRequest {
        headers,
        body: body.to_vec(),
        is_base64_encoded,
    };
    let response = pipeline.handle(request).await;

    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = signal_or_pending(tokio::signal::ctrl_c(), "SIGINT");

    #[cfg(unix)]
    let terminate = signal_or_pending(
        async {
            use tokio::signal::unix::{signal, SignalKind};
            signal(SignalKind::terminate())?.recv().await;
            Ok::<(), std::io::Error>(())
        },
        "SIGTERM",
    );

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

/// Waits for a signal. A listener that cannot be installed parks forever instead of resolving.
async fn signal_or_pending<E: std::fmt::Display>(
    listener: impl Future<Output = Result<(), E>>,
    name: &str,
) {
    if let Err(e) = listener.await {
        warn!(error = %e, signal = name, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
}
