//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Signalen API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod signals;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health check that verifies database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    crate::db::health_check(&state.db).await.map_err(|error| {
        tracing::error!("health check failed: {:?}", error);
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database service unavailable",
        )
    })?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
