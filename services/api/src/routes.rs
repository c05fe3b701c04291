use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use onroute_policy::policy::{IdMap, Policy, ValidationResult};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PolicySummary {
    pub(crate) version: String,
    pub(crate) permit_types: IdMap,
}

pub(crate) fn policy_router(policy: Arc<Policy>) -> Router {
    Router::new()
        .route("/api/v1/policy", get(policy_summary))
        .route(
            "/api/v1/policy/permit-types/:id/vehicles",
            get(permittable_vehicles),
        )
        .route("/api/v1/policy/validate", post(validate_application))
        .with_state(policy)
}

pub(crate) fn with_policy_routes(policy: Arc<Policy>) -> Router {
    policy_router(policy)
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

pub(crate) async fn policy_summary(State(policy): State<Arc<Policy>>) -> Json<PolicySummary> {
    Json(PolicySummary {
        version: policy.version().to_string(),
        permit_types: policy.permit_types(),
    })
}

pub(crate) async fn permittable_vehicles(
    State(policy): State<Arc<Policy>>,
    Path(permit_type): Path<String>,
) -> Response {
    match policy.permittable_vehicle_types(&permit_type) {
        Some(vehicles) => Json(vehicles).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("permit type '{permit_type}' is not defined") })),
        )
            .into_response(),
    }
}

/// Accepts any JSON permit application, `null` included. Missing or
/// mistyped fields are reported as violations rather than rejected.
pub(crate) async fn validate_application(
    State(policy): State<Arc<Policy>>,
    Json(application): Json<serde_json::Value>,
) -> Json<ValidationResult> {
    Json(policy.validate_document(&application).await)
}
