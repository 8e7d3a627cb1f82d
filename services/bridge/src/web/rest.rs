//! services/bridge/src/web/rest.rs
//!
//! Contains the Axum handlers for the read-only REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::sensors::{self, Sensor};
use crate::web::services::{self, ServiceCall, ServiceCallResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_sensors_handler,
        get_sensor_handler,
        status_handler,
        refresh_handler,
        services::call_service_handler,
    ),
    components(
        schemas(Sensor, StatusResponse, ServiceCall, ServiceCallResponse)
    ),
    tags(
        (name = "ChoreBoard Bridge API", description = "Sensors and services for a ChoreBoard household.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Health of the bridge's connection to ChoreBoard.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// True when the most recent refresh succeeded.
    pub available: bool,
    /// True when ChoreBoard refused the configured credentials.
    pub needs_reconfiguration: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

const NOT_READY: &str = "No data has been fetched from ChoreBoard yet";

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every sensor rendered from the latest snapshot.
#[utoipa::path(
    get,
    path = "/sensors",
    responses(
        (status = 200, description = "All sensors", body = [Sensor]),
        (status = 503, description = "No snapshot has been fetched yet")
    )
)]
pub async fn list_sensors_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Sensor>>, (StatusCode, String)> {
    let published = app_state
        .coordinator
        .current()
        .await
        .ok_or_else(|| (StatusCode::SERVICE_UNAVAILABLE, NOT_READY.to_string()))?;
    let settings = app_state.coordinator.settings();
    Ok(Json(sensors::render(
        &published,
        &settings.monitored_users,
        &settings.time_zone,
    )))
}

/// Fetch a single sensor by id.
#[utoipa::path(
    get,
    path = "/sensors/{id}",
    params(
        ("id" = String, Path, description = "Sensor id, e.g. `late_chores` or `sam_my_chores`.")
    ),
    responses(
        (status = 200, description = "The sensor", body = Sensor),
        (status = 404, description = "No sensor with that id"),
        (status = 503, description = "No snapshot has been fetched yet")
    )
)]
pub async fn get_sensor_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Sensor>, (StatusCode, String)> {
    let Json(all) = list_sensors_handler(State(app_state)).await?;
    all.into_iter()
        .find(|s| s.id == id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown sensor: {}", id)))
}

/// Report whether the bridge is currently in sync with ChoreBoard.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Connection status", body = StatusResponse)
    )
)]
pub async fn status_handler(State(app_state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = app_state.coordinator.status().await;
    Json(StatusResponse {
        available: status.available,
        needs_reconfiguration: status.needs_reconfiguration,
        last_success: status.last_success,
        last_error: status.last_error,
    })
}

/// Ask the poll loop to refresh now rather than at the next interval.
#[utoipa::path(
    post,
    path = "/refresh",
    responses(
        (status = 202, description = "Refresh scheduled")
    )
)]
pub async fn refresh_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    app_state.coordinator.request_refresh();
    StatusCode::ACCEPTED
}
