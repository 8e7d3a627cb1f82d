//! services/bridge/src/adapters/choreboard_http.rs
//!
//! This module contains the HTTP adapter, which is the concrete implementation
//! of the `ChoreBoardService` port from the `core` crate. It talks to the
//! ChoreBoard REST API using `reqwest`.

use crate::adapters::token::TokenSigner;
use crate::config::Config;
use async_trait::async_trait;
use choreboard_core::domain::{
    ArcadeSession, Chore, ChoreAction, ChoreLeaderboard, Completion, User,
};
use choreboard_core::ingest;
use choreboard_core::ports::{ChoreBoardService, PortError, PortResult};
use chrono_tz::Tz;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

//=========================================================================================
// Endpoints
//=========================================================================================

const API_OUTSTANDING: &str = "/api/outstanding/";
const API_LATE: &str = "/api/late-chores/";
const API_USERS: &str = "/api/users/";
const API_RECENT_COMPLETIONS: &str = "/api/completions/recent/";
const API_CHORE_LEADERBOARDS: &str = "/api/chore-leaderboards/";
const API_SETTINGS: &str = "/api/settings/";
const API_ARCADE_STATUS: &str = "/api/arcade/status/";

const API_CLAIM: &str = "/api/claim/";
const API_UNCLAIM: &str = "/api/unclaim/";
const API_COMPLETE: &str = "/api/complete/";
const API_UNDO: &str = "/api/undo/";
const API_ARCADE_START: &str = "/api/arcade/start/";
const API_ARCADE_STOP: &str = "/api/arcade/stop/";
const API_ARCADE_APPROVE: &str = "/api/arcade/approve/";
const API_ARCADE_DENY: &str = "/api/arcade/deny/";
const API_ARCADE_CONTINUE: &str = "/api/arcade/continue/";
const API_ARCADE_CANCEL: &str = "/api/arcade/cancel/";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ChoreBoardService` port over HTTP.
#[derive(Clone, Debug)]
pub struct ChoreBoardHttpAdapter {
    client: reqwest::Client,
    base_url: String,
    signer: TokenSigner,
    time_zone: Tz,
}

impl ChoreBoardHttpAdapter {
    /// Creates a new `ChoreBoardHttpAdapter`.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        signer: TokenSigner,
        time_zone: Tz,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
            time_zone,
        }
    }

    /// Builds the adapter and its HTTP client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(
            client,
            &config.choreboard_url,
            TokenSigner::new(&config.username, &config.secret_key),
            config.time_zone,
        ))
    }

    /// Sends an authenticated request and decodes the JSON body.
    ///
    /// A 401 is answered by minting a fresh token and retrying once; a second
    /// 401 surfaces as `PortError::Unauthorized`.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> PortResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut token_refreshed = false;

        loop {
            let token = self.signer.mint()?;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(token)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, "Sending request to ChoreBoard");
            let response = request.send().await.map_err(|e| {
                error!("Connection error for {}: {}", url, e);
                PortError::Unavailable(format!("Connection failed: {}", e))
            })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                if !token_refreshed {
                    warn!("Authentication failed, minting a fresh token and retrying once");
                    token_refreshed = true;
                    continue;
                }
                error!("Authentication failed again after token refresh");
                return Err(PortError::Unauthorized);
            }
            if status == StatusCode::NOT_FOUND {
                error!("Endpoint not found: {}", url);
                return Err(PortError::NotFound(endpoint.to_string()));
            }
            if status.is_server_error() {
                error!("Server error {} from {}", status, url);
                return Err(PortError::Unavailable(format!("Server error: {}", status)));
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!("Request to {} rejected with {}: {}", url, status, text);
                return Err(PortError::Rejected(format!("{}: {}", status, text.trim())));
            }

            let bytes = response.bytes().await.map_err(|e| {
                PortError::Unavailable(format!("Failed to read response body: {}", e))
            })?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| {
                PortError::Unexpected(format!("Invalid JSON from {}: {}", endpoint, e))
            });
        }
    }

    /// GETs a list endpoint. Anything other than a JSON array reads as empty.
    async fn get_list(&self, endpoint: &str, query: &[(&str, String)]) -> PortResult<Vec<Value>> {
        match self.request(Method::GET, endpoint, query, None).await? {
            Value::Array(items) => Ok(items),
            other => {
                warn!(endpoint, kind = json_kind(&other), "Expected a JSON array");
                Ok(Vec::new())
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn insert_opt<T: serde::Serialize>(body: &mut Value, key: &str, value: Option<T>) {
    if let (Some(value), Some(map)) = (value, body.as_object_mut()) {
        map.insert(key.to_string(), json!(value));
    }
}

/// Maps an action to its endpoint and JSON body.
pub fn action_request(action: &ChoreAction) -> (&'static str, Value) {
    match action {
        ChoreAction::Claim {
            instance_id,
            assign_to_user_id,
        } => {
            let mut body = json!({ "instance_id": instance_id });
            insert_opt(&mut body, "assign_to_user_id", *assign_to_user_id);
            (API_CLAIM, body)
        }
        ChoreAction::Unclaim { instance_id } => {
            (API_UNCLAIM, json!({ "instance_id": instance_id }))
        }
        ChoreAction::Complete {
            instance_id,
            helper_ids,
            completed_by_user_id,
        } => {
            let mut body = json!({ "instance_id": instance_id });
            insert_opt(
                &mut body,
                "helper_ids",
                (!helper_ids.is_empty()).then_some(helper_ids),
            );
            insert_opt(&mut body, "completed_by_user_id", *completed_by_user_id);
            (API_COMPLETE, body)
        }
        ChoreAction::Undo { completion_id } => {
            (API_UNDO, json!({ "completion_id": completion_id }))
        }
        ChoreAction::StartArcade {
            instance_id,
            user_id,
        } => {
            let mut body = json!({ "instance_id": instance_id });
            insert_opt(&mut body, "user_id", *user_id);
            (API_ARCADE_START, body)
        }
        ChoreAction::StopArcade { session_id } => {
            (API_ARCADE_STOP, json!({ "session_id": session_id }))
        }
        ChoreAction::ApproveArcade {
            session_id,
            judge_id,
            notes,
        } => {
            let mut body = json!({ "session_id": session_id });
            insert_opt(&mut body, "judge_id", *judge_id);
            insert_opt(&mut body, "notes", notes.as_deref());
            (API_ARCADE_APPROVE, body)
        }
        ChoreAction::DenyArcade {
            session_id,
            judge_id,
            notes,
        } => {
            let mut body = json!({ "session_id": session_id });
            insert_opt(&mut body, "judge_id", *judge_id);
            insert_opt(&mut body, "notes", notes.as_deref());
            (API_ARCADE_DENY, body)
        }
        ChoreAction::ContinueArcade { session_id } => {
            (API_ARCADE_CONTINUE, json!({ "session_id": session_id }))
        }
        ChoreAction::CancelArcade { session_id } => {
            (API_ARCADE_CANCEL, json!({ "session_id": session_id }))
        }
    }
}

//=========================================================================================
// `ChoreBoardService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChoreBoardService for ChoreBoardHttpAdapter {
    async fn outstanding_chores(&self) -> PortResult<Vec<Chore>> {
        let values = self.get_list(API_OUTSTANDING, &[]).await?;
        Ok(ingest::chores(values, &self.time_zone))
    }

    async fn late_chores(&self) -> PortResult<Vec<Chore>> {
        let values = self.get_list(API_LATE, &[]).await?;
        Ok(ingest::chores(values, &self.time_zone))
    }

    async fn users(&self) -> PortResult<Vec<User>> {
        let values = self.get_list(API_USERS, &[]).await?;
        Ok(ingest::users(values))
    }

    async fn recent_completions(&self, limit: usize) -> PortResult<Vec<Completion>> {
        let values = self
            .get_list(API_RECENT_COMPLETIONS, &[("limit", limit.to_string())])
            .await?;
        Ok(ingest::completions(values, &self.time_zone))
    }

    async fn points_label(&self) -> PortResult<String> {
        let settings = self.request(Method::GET, API_SETTINGS, &[], None).await?;
        Ok(ingest::points_label(&settings))
    }

    async fn chore_leaderboards(&self) -> PortResult<Vec<ChoreLeaderboard>> {
        let values = self.get_list(API_CHORE_LEADERBOARDS, &[]).await?;
        Ok(ingest::chore_leaderboards(values))
    }

    async fn arcade_session(&self, user: &User) -> PortResult<Option<ArcadeSession>> {
        let status = self
            .request(
                Method::GET,
                API_ARCADE_STATUS,
                &[("user_id", user.id.to_string())],
                None,
            )
            .await?;
        Ok(ingest::arcade_session(status, user, &self.time_zone))
    }

    async fn perform(&self, action: &ChoreAction) -> PortResult<()> {
        let (endpoint, body) = action_request(action);
        self.request(Method::POST, endpoint, &[], Some(&body)).await?;
        info!(action = action.name(), target_id = action.target_id(), "Action accepted by ChoreBoard");
        Ok(())
    }
}
