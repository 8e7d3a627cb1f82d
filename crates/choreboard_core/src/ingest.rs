//! crates/choreboard_core/src/ingest.rs
//!
//! Converts the backend's JSON arrays into domain records.
//!
//! Every array element is decoded on its own: an element that cannot be turned
//! into a record is logged and skipped, and the rest of the batch is kept.

use crate::domain::{
    ArcadeSession, Chore, ChoreLeaderboard, ChoreStatus, Completion, HighScore, LastCompletion,
    User, UserRef,
};
use crate::time::parse_timestamp;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_POINTS_LABEL: &str = "points";

//=========================================================================================
// Wire Helpers
//=========================================================================================

/// A number the backend may send either as JSON number or as decimal string ("25.00").
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// `assigned_to` and friends: a nested user object, a bare username or a bare id.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
enum UserRefWire {
    Object {
        id: Option<i64>,
        username: Option<String>,
        display_name: Option<String>,
        name: Option<String>,
        /// Some endpoints wrap the user one level deeper.
        user: Option<Box<UserRefWire>>,
    },
    Username(String),
    Id(i64),
}

impl UserRefWire {
    fn to_domain(self) -> Option<UserRef> {
        match self {
            UserRefWire::Object {
                id,
                username,
                display_name,
                name,
                user,
            } => {
                if let Some(inner) = user {
                    return inner.to_domain();
                }
                let display_name = display_name.or(name);
                let username = username
                    .or_else(|| display_name.clone())
                    .or_else(|| id.map(|id| id.to_string()))?;
                Some(UserRef {
                    id,
                    username,
                    display_name,
                })
            }
            UserRefWire::Username(username) if username.trim().is_empty() => None,
            UserRefWire::Username(username) => Some(UserRef {
                id: None,
                username,
                display_name: None,
            }),
            UserRefWire::Id(id) => Some(UserRef {
                id: Some(id),
                username: id.to_string(),
                display_name: None,
            }),
        }
    }
}

fn timestamp(raw: Option<String>, tz: &Tz, field: &str, id: i64) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_timestamp(&raw, tz);
    if parsed.is_none() {
        warn!(record_id = id, field, value = %raw, "Ignoring unparseable timestamp");
    }
    parsed
}

fn number(value: Option<LooseNumber>) -> Option<f64> {
    value.as_ref().and_then(LooseNumber::as_f64)
}

fn decode_each<W: DeserializeOwned>(values: Vec<Value>, kind: &str) -> Vec<W> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<W>(value) {
            Ok(wire) => Some(wire),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

//=========================================================================================
// Chores
//=========================================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChoreDefinitionWire {
    name: Option<String>,
    description: Option<String>,
    points: Option<LooseNumber>,
    is_pool: Option<bool>,
    complete_later: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LastCompletionWire {
    completed_by: Option<UserRefWire>,
    completed_at: Option<String>,
    was_late: Option<bool>,
    helpers: Option<Vec<UserRefWire>>,
}

#[derive(Deserialize)]
struct ChoreWire {
    id: i64,
    #[serde(default)]
    chore: Option<ChoreDefinitionWire>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    assigned_to: Option<UserRefWire>,
    #[serde(default)]
    due_at: Option<String>,
    #[serde(default)]
    points_value: Option<LooseNumber>,
    #[serde(default)]
    points: Option<LooseNumber>,
    #[serde(default)]
    is_pool: Option<bool>,
    #[serde(default)]
    complete_later: Option<bool>,
    #[serde(default)]
    last_completion: Option<LastCompletionWire>,
}

impl ChoreWire {
    fn to_domain(self, tz: &Tz) -> Chore {
        let id = self.id;
        let definition = self.chore.unwrap_or_default();

        let status = self.status.as_deref().map(ChoreStatus::parse);
        let points = number(self.points_value)
            .or_else(|| number(definition.points))
            .or_else(|| number(self.points))
            .unwrap_or(0.0);

        let last_completion = self.last_completion.map(|wire| LastCompletion {
            completed_by: wire.completed_by.and_then(UserRefWire::to_domain),
            completed_at: timestamp(wire.completed_at, tz, "last_completion.completed_at", id),
            was_late: wire.was_late.unwrap_or(false),
            helpers: wire
                .helpers
                .unwrap_or_default()
                .into_iter()
                .filter_map(UserRefWire::to_domain)
                .collect(),
        });

        Chore {
            id,
            name: definition
                .name
                .or(self.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            description: definition
                .description
                .or(self.description)
                .unwrap_or_default(),
            assignee: self.assigned_to.and_then(UserRefWire::to_domain),
            due_at: timestamp(self.due_at, tz, "due_at", id),
            points,
            status,
            is_pool: definition.is_pool.or(self.is_pool).unwrap_or(false),
            complete_later: definition
                .complete_later
                .or(self.complete_later)
                .unwrap_or(false),
            last_completion,
        }
    }
}

/// Decodes chore instances. Elements without an integer `id` are skipped.
pub fn chores(values: Vec<Value>, tz: &Tz) -> Vec<Chore> {
    decode_each::<ChoreWire>(values, "chore")
        .into_iter()
        .map(|wire| wire.to_domain(tz))
        .collect()
}

/// Appends `extra` to `base`, dropping chores whose id is already present.
/// Arrival order is preserved.
pub fn merge_chores(mut base: Vec<Chore>, extra: Vec<Chore>) -> Vec<Chore> {
    for chore in extra {
        if !base.iter().any(|existing| existing.id == chore.id) {
            base.push(chore);
        }
    }
    base
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Deserialize)]
struct UserWire {
    id: i64,
    username: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    can_be_assigned: Option<bool>,
    #[serde(default)]
    eligible_for_points: Option<bool>,
    #[serde(default)]
    weekly_points: Option<LooseNumber>,
    #[serde(default)]
    all_time_points: Option<LooseNumber>,
    #[serde(default)]
    claims_today: Option<u32>,
}

/// Decodes user records. Elements without `id` and `username` are skipped.
pub fn users(values: Vec<Value>) -> Vec<User> {
    decode_each::<UserWire>(values, "user")
        .into_iter()
        .map(|wire| User {
            id: wire.id,
            display_name: wire
                .display_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| wire.username.clone()),
            username: wire.username,
            first_name: wire.first_name.unwrap_or_default(),
            can_be_assigned: wire.can_be_assigned.unwrap_or(true),
            eligible_for_points: wire.eligible_for_points.unwrap_or(true),
            weekly_points: number(wire.weekly_points).unwrap_or(0.0),
            all_time_points: number(wire.all_time_points).unwrap_or(0.0),
            claims_today: wire.claims_today,
        })
        .collect()
}

//=========================================================================================
// Completions
//=========================================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChoreNameWire {
    name: Option<String>,
}

#[derive(Deserialize)]
struct CompletionWire {
    id: i64,
    #[serde(default)]
    chore_name: Option<String>,
    #[serde(default)]
    chore: Option<ChoreNameWire>,
    #[serde(default)]
    completed_by: Option<UserRefWire>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    was_late: Option<bool>,
    #[serde(default)]
    helpers: Option<Vec<UserRefWire>>,
    #[serde(default)]
    points: Option<LooseNumber>,
}

pub fn completions(values: Vec<Value>, tz: &Tz) -> Vec<Completion> {
    decode_each::<CompletionWire>(values, "completion")
        .into_iter()
        .map(|wire| Completion {
            id: wire.id,
            chore_name: wire
                .chore_name
                .or_else(|| wire.chore.and_then(|c| c.name))
                .unwrap_or_else(|| "Unknown".to_string()),
            completed_by: wire.completed_by.and_then(UserRefWire::to_domain),
            completed_at: timestamp(wire.completed_at, tz, "completed_at", wire.id),
            was_late: wire.was_late.unwrap_or(false),
            helpers: wire
                .helpers
                .unwrap_or_default()
                .into_iter()
                .filter_map(UserRefWire::to_domain)
                .collect(),
            points: number(wire.points).unwrap_or(0.0),
        })
        .collect()
}

//=========================================================================================
// Arcade Mode
//=========================================================================================

#[derive(Deserialize)]
struct HighScoreWire {
    #[serde(default)]
    rank: Option<usize>,
    user: UserRefWire,
    time_seconds: LooseNumber,
}

#[derive(Deserialize)]
struct ChoreLeaderboardWire {
    chore_id: i64,
    #[serde(default)]
    chore_name: Option<String>,
    #[serde(default)]
    high_scores: Option<Vec<Value>>,
}

/// Decodes per-chore arcade leaderboards. Malformed score rows are skipped.
/// Missing ranks fall back to the row position.
pub fn chore_leaderboards(values: Vec<Value>) -> Vec<ChoreLeaderboard> {
    decode_each::<ChoreLeaderboardWire>(values, "chore_leaderboard")
        .into_iter()
        .map(|wire| {
            let rows = wire.high_scores.unwrap_or_default();
            let scores = decode_each::<HighScoreWire>(rows, "high_score")
                .into_iter()
                .enumerate()
                .filter_map(|(index, score)| {
                    Some(HighScore {
                        rank: score.rank.unwrap_or(index + 1),
                        user: score.user.to_domain()?,
                        time_seconds: score.time_seconds.as_f64()?.max(0.0).round() as u64,
                    })
                })
                .collect();
            ChoreLeaderboard {
                chore_id: wire.chore_id,
                chore_name: wire.chore_name.unwrap_or_else(|| "Unknown".to_string()),
                scores,
            }
        })
        .collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ArcadeStatusWire {
    has_active_session: bool,
    session_id: Option<i64>,
    instance_id: Option<i64>,
    chore_name: Option<String>,
    started_at: Option<String>,
    elapsed_seconds: Option<LooseNumber>,
    status: Option<String>,
}

/// Decodes the arcade status endpoint. `None` when the user has no active session.
pub fn arcade_session(value: Value, user: &User, tz: &Tz) -> Option<ArcadeSession> {
    let wire = match serde_json::from_value::<ArcadeStatusWire>(value) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(username = %user.username, error = %e, "Malformed arcade status");
            return None;
        }
    };
    if !wire.has_active_session {
        return None;
    }
    Some(ArcadeSession {
        session_id: wire.session_id,
        chore_id: wire.instance_id,
        chore_name: wire.chore_name,
        user_id: user.id,
        username: user.username.clone(),
        started_at: timestamp(wire.started_at, tz, "started_at", user.id),
        elapsed_seconds: number(wire.elapsed_seconds)
            .map(|s| s.max(0.0).round() as u64)
            .unwrap_or(0),
        status: wire.status.unwrap_or_else(|| "active".to_string()),
    })
}

//=========================================================================================
// Settings
//=========================================================================================

/// Reads the custom points label from the site settings object.
pub fn points_label(value: &Value) -> String {
    value
        .get("points_label")
        .and_then(Value::as_str)
        .filter(|label| !label.trim().is_empty())
        .unwrap_or(DEFAULT_POINTS_LABEL)
        .to_string()
}
