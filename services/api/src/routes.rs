use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use resource_flow::error::AppError;
use resource_flow::planning::{
    planning_router, ImportKind, ImportSummary, PlanningRepository, PlanningService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_planning_routes<R>(service: Arc<PlanningService<R>>) -> Router
where
    R: PlanningRepository + 'static,
{
    let imports = Router::new()
        .route("/api/v1/import/:kind", post(import_endpoint::<R>))
        .with_state(service.clone());

    planning_router(service)
        .merge(imports)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts a CSV export as the request body and creates one record per row.
pub(crate) async fn import_endpoint<R: PlanningRepository + 'static>(
    State(service): State<Arc<PlanningService<R>>>,
    Path(kind): Path<ImportKind>,
    body: String,
) -> Result<(StatusCode, Json<ImportSummary>), AppError> {
    let summary = service.import(kind, body.as_bytes())?;
    Ok((StatusCode::CREATED, Json(summary)))
}
