//! services/bridge/src/web/services.rs
//!
//! Callable services. Each call is validated into a `ChoreAction`, forwarded
//! to the backend, and followed by an immediate refresh.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use choreboard_core::domain::ChoreAction;
use choreboard_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Call data accepted by every service. Which fields are required depends on
/// the service; `chore_id` names the chore instance (or the completion, for
/// `undo_completion`).
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ServiceCall {
    pub chore_id: Option<i64>,
    pub instance_id: Option<i64>,
    pub session_id: Option<i64>,
    pub user_id: Option<i64>,
    pub assign_to_user_id: Option<i64>,
    pub completed_by_user_id: Option<i64>,
    #[serde(default)]
    pub helpers: Vec<i64>,
    pub judge_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceCallResponse {
    pub service: String,
    pub target_id: i64,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ServiceCallError {
    #[error("Unknown service: {0}")]
    UnknownService(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ServiceCall {
    /// Builds the action for service `name`, checking its required fields.
    pub fn into_action(self, name: &str) -> Result<ChoreAction, ServiceCallError> {
        let instance = || {
            self.chore_id
                .or(self.instance_id)
                .ok_or(ServiceCallError::MissingField("chore_id"))
        };
        let session = || self.session_id.ok_or(ServiceCallError::MissingField("session_id"));

        let action = match name {
            "claim_chore" => ChoreAction::Claim {
                instance_id: instance()?,
                assign_to_user_id: self.assign_to_user_id,
            },
            "unclaim_chore" => ChoreAction::Unclaim {
                instance_id: instance()?,
            },
            "mark_complete" => ChoreAction::Complete {
                instance_id: instance()?,
                helper_ids: self.helpers.clone(),
                completed_by_user_id: self.completed_by_user_id,
            },
            "undo_completion" => ChoreAction::Undo {
                completion_id: self
                    .chore_id
                    .ok_or(ServiceCallError::MissingField("chore_id"))?,
            },
            "start_arcade" => ChoreAction::StartArcade {
                instance_id: self
                    .instance_id
                    .or(self.chore_id)
                    .ok_or(ServiceCallError::MissingField("instance_id"))?,
                user_id: self.user_id,
            },
            "stop_arcade" => ChoreAction::StopArcade {
                session_id: session()?,
            },
            "approve_arcade" => ChoreAction::ApproveArcade {
                session_id: session()?,
                judge_id: self.judge_id,
                notes: self.notes.clone(),
            },
            "deny_arcade" => ChoreAction::DenyArcade {
                session_id: session()?,
                judge_id: self.judge_id,
                notes: self.notes.clone(),
            },
            "continue_arcade" => ChoreAction::ContinueArcade {
                session_id: session()?,
            },
            "cancel_arcade" => ChoreAction::CancelArcade {
                session_id: session()?,
            },
            other => return Err(ServiceCallError::UnknownService(other.to_string())),
        };
        Ok(action)
    }
}

/// Call a ChoreBoard service.
///
/// The action is forwarded to the backend; on success the bridge refreshes
/// its snapshot before responding.
#[utoipa::path(
    post,
    path = "/services/{name}",
    request_body = ServiceCall,
    params(
        ("name" = String, Path, description = "Service name, e.g. `claim_chore` or `approve_arcade`.")
    ),
    responses(
        (status = 200, description = "Action accepted", body = ServiceCallResponse),
        (status = 400, description = "Missing a required field"),
        (status = 401, description = "Missing or wrong API key"),
        (status = 404, description = "Unknown service"),
        (status = 502, description = "ChoreBoard rejected the action"),
        (status = 503, description = "ChoreBoard is unreachable")
    )
)]
pub async fn call_service_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(call): Json<ServiceCall>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let action = call.into_action(&name).map_err(|e| {
        warn!(service = %name, "Invalid service call: {}", e);
        let status = match e {
            ServiceCallError::UnknownService(_) => StatusCode::NOT_FOUND,
            ServiceCallError::MissingField(_) => StatusCode::BAD_REQUEST,
        };
        (status, e.to_string())
    })?;

    app_state
        .coordinator
        .perform(&action)
        .await
        .map_err(|e| {
            error!(service = %name, "Service call failed: {}", e);
            let status = match e {
                PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, e.to_string())
        })?;

    Ok(Json(ServiceCallResponse {
        service: name,
        target_id: action.target_id(),
    }))
}
