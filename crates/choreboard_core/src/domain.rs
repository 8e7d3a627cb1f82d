//! crates/choreboard_core/src/domain.rs
//!
//! Defines the core data structures for the bridge.
//! These are validated, typed forms of the backend's JSON records; the raw wire
//! shapes live in `ingest`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

//=========================================================================================
// Users
//=========================================================================================

/// A reference to a user embedded in another record (assignee, completer, helper).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRef {
    pub id: Option<i64>,
    pub username: String,
    pub display_name: Option<String>,
}

impl UserRef {
    /// The name shown to people: the display name when set, the username otherwise.
    pub fn display(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// A full user record as returned by the users endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub first_name: String,
    pub can_be_assigned: bool,
    pub eligible_for_points: bool,
    pub weekly_points: f64,
    pub all_time_points: f64,
    pub claims_today: Option<u32>,
}

/// One position on a points leaderboard, derived from `User` records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUser {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub points: f64,
}

//=========================================================================================
// Chores
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChoreStatus {
    Pool,
    Assigned,
    Completed,
    Skipped,
    Other(String),
}

impl ChoreStatus {
    /// Parses a backend status value. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "POOL" => ChoreStatus::Pool,
            "ASSIGNED" => ChoreStatus::Assigned,
            "COMPLETE" | "COMPLETED" => ChoreStatus::Completed,
            "SKIPPED" => ChoreStatus::Skipped,
            _ => ChoreStatus::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChoreStatus::Pool => "POOL",
            ChoreStatus::Assigned => "ASSIGNED",
            ChoreStatus::Completed => "COMPLETED",
            ChoreStatus::Skipped => "SKIPPED",
            ChoreStatus::Other(s) => s,
        }
    }

    /// Terminal statuses never appear in the due-date views.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChoreStatus::Completed | ChoreStatus::Skipped)
    }
}

impl fmt::Display for ChoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChoreStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The most recent completion of a chore, as embedded in the chore record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastCompletion {
    pub completed_by: Option<UserRef>,
    pub completed_at: Option<DateTime<Utc>>,
    pub was_late: bool,
    pub helpers: Vec<UserRef>,
}

/// A chore instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chore {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub assignee: Option<UserRef>,
    pub due_at: Option<DateTime<Utc>>,
    pub points: f64,
    /// `None` when the backend sent no status; such chores are excluded from every view.
    pub status: Option<ChoreStatus>,
    pub is_pool: bool,
    pub complete_later: bool,
    pub last_completion: Option<LastCompletion>,
}

impl Chore {
    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(ChoreStatus::is_terminal)
    }

    pub fn is_assigned_to(&self, username: &str) -> bool {
        self.assignee
            .as_ref()
            .is_some_and(|assignee| assignee.username == username)
    }
}

//=========================================================================================
// History, arcade mode and settings
//=========================================================================================

/// An entry of the recent completion history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub id: i64,
    pub chore_name: String,
    pub completed_by: Option<UserRef>,
    pub completed_at: Option<DateTime<Utc>>,
    pub was_late: bool,
    pub helpers: Vec<UserRef>,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighScore {
    pub rank: usize,
    pub user: UserRef,
    pub time_seconds: u64,
}

/// Arcade-mode high scores for a single chore.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoreLeaderboard {
    pub chore_id: i64,
    pub chore_name: String,
    pub scores: Vec<HighScore>,
}

/// An arcade session currently running for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcadeSession {
    pub session_id: Option<i64>,
    pub chore_id: Option<i64>,
    pub chore_name: Option<String>,
    pub user_id: i64,
    pub username: String,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub status: String,
}

//=========================================================================================
// Snapshot
//=========================================================================================

/// One complete fetch from the backend.
///
/// Snapshots are never mutated. A newer fetch replaces the whole value.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub chores: Vec<Chore>,
    pub users: Vec<User>,
    pub completions: Vec<Completion>,
    pub chore_leaderboards: Vec<ChoreLeaderboard>,
    /// Active arcade sessions keyed by monitored username.
    pub arcade_sessions: BTreeMap<String, ArcadeSession>,
    pub points_label: String,
}

//=========================================================================================
// Write actions
//=========================================================================================

/// A write forwarded verbatim to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoreAction {
    Claim {
        instance_id: i64,
        assign_to_user_id: Option<i64>,
    },
    Unclaim {
        instance_id: i64,
    },
    Complete {
        instance_id: i64,
        helper_ids: Vec<i64>,
        completed_by_user_id: Option<i64>,
    },
    Undo {
        completion_id: i64,
    },
    StartArcade {
        instance_id: i64,
        user_id: Option<i64>,
    },
    StopArcade {
        session_id: i64,
    },
    ApproveArcade {
        session_id: i64,
        judge_id: Option<i64>,
        notes: Option<String>,
    },
    DenyArcade {
        session_id: i64,
        judge_id: Option<i64>,
        notes: Option<String>,
    },
    ContinueArcade {
        session_id: i64,
    },
    CancelArcade {
        session_id: i64,
    },
}

impl ChoreAction {
    /// The service name the action is exposed under.
    pub fn name(&self) -> &'static str {
        match self {
            ChoreAction::Claim { .. } => "claim_chore",
            ChoreAction::Unclaim { .. } => "unclaim_chore",
            ChoreAction::Complete { .. } => "mark_complete",
            ChoreAction::Undo { .. } => "undo_completion",
            ChoreAction::StartArcade { .. } => "start_arcade",
            ChoreAction::StopArcade { .. } => "stop_arcade",
            ChoreAction::ApproveArcade { .. } => "approve_arcade",
            ChoreAction::DenyArcade { .. } => "deny_arcade",
            ChoreAction::ContinueArcade { .. } => "continue_arcade",
            ChoreAction::CancelArcade { .. } => "cancel_arcade",
        }
    }

    /// The identifier of the record the action targets.
    pub fn target_id(&self) -> i64 {
        match self {
            ChoreAction::Claim { instance_id, .. }
            | ChoreAction::Unclaim { instance_id }
            | ChoreAction::Complete { instance_id, .. }
            | ChoreAction::StartArcade { instance_id, .. } => *instance_id,
            ChoreAction::Undo { completion_id } => *completion_id,
            ChoreAction::StopArcade { session_id }
            | ChoreAction::ApproveArcade { session_id, .. }
            | ChoreAction::DenyArcade { session_id, .. }
            | ChoreAction::ContinueArcade { session_id }
            | ChoreAction::CancelArcade { session_id } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive_and_keeps_unknown_values() {
        assert_eq!(ChoreStatus::parse("pool"), ChoreStatus::Pool);
        assert_eq!(ChoreStatus::parse("COMPLETE"), ChoreStatus::Completed);
        assert_eq!(ChoreStatus::parse("Completed"), ChoreStatus::Completed);
        assert_eq!(
            ChoreStatus::parse("on_hold"),
            ChoreStatus::Other("ON_HOLD".to_string())
        );
        assert!(ChoreStatus::Skipped.is_terminal());
        assert!(!ChoreStatus::Assigned.is_terminal());
    }

    #[test]
    fn user_ref_display_falls_back_to_username() {
        let mut user = UserRef {
            id: Some(1),
            username: "alex".to_string(),
            display_name: None,
        };
        assert_eq!(user.display(), "alex");
        user.display_name = Some(String::new());
        assert_eq!(user.display(), "alex");
        user.display_name = Some("Alex P.".to_string());
        assert_eq!(user.display(), "Alex P.");
    }
}
