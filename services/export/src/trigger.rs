use crate::config::TriggerConfig;
use crate::job::ExportJob;
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// State shared across trigger handlers
#[derive(Clone)]
pub struct TriggerState {
    pub job: Arc<ExportJob>,
    /// Held for the whole of a run so overlapping requests queue up
    pub run_lock: Arc<Mutex<()>>,
}

impl TriggerState {
    pub fn new(job: Arc<ExportJob>) -> Self {
        Self {
            job,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Routes for schedulers that invoke the job over HTTP
pub fn create_router(state: TriggerState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/run", get(run_job).post(run_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<TriggerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.job.config().service.name
    }))
}

/// Run the export once and answer with its plain-text status.
///
/// A rejected analytics request is part of the status text, not an error.
async fn run_job(State(state): State<TriggerState>) -> (StatusCode, String) {
    let _guard = state.run_lock.lock().await;
    debug!("Run lock acquired");

    match state.job.run().await {
        Ok(status) => (StatusCode::OK, status),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Serve the trigger until `shutdown` resolves
pub async fn start_trigger_server(
    job: Arc<ExportJob>,
    config: &TriggerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(TriggerState::new(job));
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting job trigger server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Trigger server error")?;

    Ok(())
}
