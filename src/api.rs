use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    clients::health::HealthChecker,
    error::PipelineError,
    models::{health::HealthStatus, request::NotificationRequest, response::ApiResponse},
    pipeline::service::NotificationService,
};

pub struct AppState {
    service: NotificationService,
    health_checker: HealthChecker,
}

impl AppState {
    pub fn new(service: NotificationService) -> Self {
        let health_checker =
            HealthChecker::new(Arc::clone(service.broker()), Arc::clone(service.store()));

        Self {
            service,
            health_checker,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/notify", post(notify))
        .route("/api/notifications/{trace_id}/status", get(notification_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let address = listener.local_addr()?;
    info!(address = %address, "HTTP server started");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Asynchronous notification pipeline" }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn notify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NotificationRequest>,
) -> Response {
    match state.service.submit(request).await {
        Ok(receipt) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(receipt, "Notification accepted")),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn notification_status(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Response {
    match state.service.query_status(&trace_id) {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(record, "Notification status retrieved")),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: PipelineError) -> Response {
    let (status_code, message) = match &e {
        PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, "Notification not found"),
        PipelineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid notification request"),
        PipelineError::Connectivity(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Message broker unavailable")
        }
        _ => {
            error!(error = %e, "Unexpected error while handling request");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };

    (
        status_code,
        Json(ApiResponse::<()>::error(e.to_string(), message)),
    )
        .into_response()
}
