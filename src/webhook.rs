use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{QimbError, Result};
use crate::services::push::PushIngester;

#[derive(Clone)]
pub struct WebhookState {
    pub ingester: Arc<PushIngester>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

pub fn build_router(ingester: Arc<PushIngester>, path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(path, post(receive_push))
        .with_state(WebhookState { ingester })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// Always 200 so the gateway does not keep retrying bodies it cannot use.
async fn receive_push(State(state): State<WebhookState>, body: Bytes) -> impl IntoResponse {
    let outcome = state.ingester.ingest(&body).await;
    debug!(?outcome, "push call handled");
    StatusCode::OK
}

pub async fn serve_with_shutdown<F>(addr: &str, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QimbError::Runtime(e.to_string()))?;
    info!(addr = %addr, "push listener started");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| QimbError::Runtime(e.to_string()))?;
    Ok(())
}
