//! services/bridge/src/sensors.rs
//!
//! Renders a published snapshot into the flat sensor list served over HTTP.
//! Each sensor has a numeric or textual state plus free-form attributes.

use crate::coordinator::Published;
use chrono_tz::Tz;
use choreboard_core::domain::{
    ArcadeSession, Chore, ChoreLeaderboard, Completion, RankedUser, User, UserRef,
};
use choreboard_core::time::{display, format_duration};
use choreboard_core::views::{PointsPeriod, UserViews};
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub unit: Option<String>,
    #[schema(value_type = Object)]
    pub state: Value,
    #[schema(value_type = Object)]
    pub attributes: Map<String, Value>,
}

impl Sensor {
    fn new(id: impl Into<String>, name: impl Into<String>, icon: &str, state: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.to_string(),
            unit: None,
            state,
            attributes: Map::new(),
        }
    }

    fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    fn attr(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }
}

/// Renders every sensor for the published snapshot.
pub fn render(published: &Published, monitored_users: &[String], tz: &Tz) -> Vec<Sensor> {
    let views = &published.views;
    let snapshot = &published.snapshot;
    let label = snapshot.points_label.as_str();

    let mut sensors = vec![
        chore_list_sensor(
            "outstanding_chores",
            "Outstanding Chores",
            "mdi:clipboard-list-outline",
            &views.outstanding,
            tz,
        ),
        chore_list_sensor(
            "late_chores",
            "Late Chores",
            "mdi:alert-circle-outline",
            &views.late,
            tz,
        ),
        chore_list_sensor("pool_chores", "Pool Chores", "mdi:pool", &views.pool, tz),
        breakdown_sensor(published),
        completion_history_sensor(&snapshot.completions, label, tz),
        leaderboard_sensor(PointsPeriod::Weekly, &views.weekly_leaderboard, label),
        leaderboard_sensor(PointsPeriod::AllTime, &views.alltime_leaderboard, label),
    ];

    for username in monitored_users {
        let empty = UserViews::default();
        let user_views = views.per_user.get(username).unwrap_or(&empty);
        sensors.extend(user_sensors(
            username,
            user_views,
            snapshot.arcade_sessions.get(username),
            label,
            tz,
        ));
    }

    sensors.extend(snapshot.chore_leaderboards.iter().map(chore_leaderboard_sensor));
    sensors
}

fn assignee_display(assignee: Option<&UserRef>) -> String {
    assignee
        .map(|a| a.display().to_string())
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

fn timestamp(ts: Option<&chrono::DateTime<chrono::Utc>>, tz: &Tz) -> Value {
    ts.map(|t| Value::String(display(t, tz))).unwrap_or(Value::Null)
}

pub fn chore_attributes(chore: &Chore, tz: &Tz) -> Value {
    let last = chore.last_completion.as_ref();
    json!({
        "id": chore.id,
        "name": chore.name,
        "description": chore.description,
        "status": chore.status.as_ref().map(|s| s.as_str()),
        "assignee": assignee_display(chore.assignee.as_ref()),
        "due_date": timestamp(chore.due_at.as_ref(), tz),
        "points": chore.points,
        "is_pool": chore.is_pool,
        "complete_later": chore.complete_later,
        "last_completed_by": last.and_then(|l| l.completed_by.as_ref()).map(|u| u.display()),
        "last_completed_at": timestamp(last.and_then(|l| l.completed_at.as_ref()), tz),
        "was_late": last.map(|l| l.was_late).unwrap_or(false),
    })
}

fn chore_list_sensor(id: &str, name: &str, icon: &str, chores: &[Chore], tz: &Tz) -> Sensor {
    let list: Vec<Value> = chores.iter().map(|c| chore_attributes(c, tz)).collect();
    Sensor::new(id, name, icon, json!(chores.len()))
        .unit("chores")
        .attr("chores", Value::Array(list))
        .attr("count", json!(chores.len()))
}

fn breakdown_sensor(published: &Published) -> Sensor {
    let breakdown = &published.views.breakdown;
    Sensor::new(
        "chore_breakdown",
        "Chore Breakdown",
        "mdi:chart-pie",
        json!(breakdown.total),
    )
    .unit("chores")
    .attr("total_chores", json!(breakdown.total))
    .attr("pool_chores", json!(breakdown.pool))
    .attr("assigned_chores", json!(breakdown.assigned))
    .attr("other_chores", json!(breakdown.other))
    .attr("pool_percentage", json!(breakdown.pool_percentage))
    .attr("assigned_percentage", json!(breakdown.assigned_percentage))
    .attr("other_percentage", json!(breakdown.other_percentage))
    .attr("status_breakdown", json!(breakdown.status_breakdown))
}

fn completion_attributes(completion: &Completion, tz: &Tz) -> Value {
    json!({
        "id": completion.id,
        "chore_name": completion.chore_name,
        "completed_by": completion.completed_by.as_ref().map(|u| u.display()),
        "completed_at": timestamp(completion.completed_at.as_ref(), tz),
        "was_late": completion.was_late,
        "helpers": completion
            .helpers
            .iter()
            .map(|h| json!({ "name": h.display(), "username": h.username }))
            .collect::<Vec<_>>(),
        "points": completion.points,
    })
}

fn completion_history_sensor(completions: &[Completion], label: &str, tz: &Tz) -> Sensor {
    let list: Vec<Value> = completions
        .iter()
        .map(|c| completion_attributes(c, tz))
        .collect();
    Sensor::new(
        "completion_history",
        "Completion History",
        "mdi:history",
        json!(completions.len()),
    )
    .attr("completions", Value::Array(list))
    .attr("count", json!(completions.len()))
    .attr("points_label", json!(label))
}

fn leaderboard_sensor(period: PointsPeriod, ranking: &[RankedUser], label: &str) -> Sensor {
    let (id, name, kind) = match period {
        PointsPeriod::Weekly => ("leaderboard_weekly", "Leaderboard - Weekly", "weekly"),
        PointsPeriod::AllTime => ("leaderboard_alltime", "Leaderboard - Alltime", "alltime"),
    };
    let users: Vec<Value> = ranking
        .iter()
        .map(|r| {
            json!({
                "rank": r.rank,
                "username": r.username,
                "display_name": r.display_name,
                "points": r.points,
            })
        })
        .collect();
    Sensor::new(id, name, "mdi:trophy-outline", json!(ranking.len()))
        .attr("type", json!(kind))
        .attr("users", Value::Array(users))
        .attr("count", json!(ranking.len()))
        .attr("points_label", json!(label))
}

fn user_sensors(
    username: &str,
    views: &UserViews,
    session: Option<&ArcadeSession>,
    label: &str,
    tz: &Tz,
) -> Vec<Sensor> {
    let mine: Vec<Value> = views.my_chores.iter().map(|c| chore_attributes(c, tz)).collect();
    let immediate: Vec<Value> = views
        .my_immediate_chores
        .iter()
        .map(|c| chore_attributes(c, tz))
        .collect();
    let total = views.my_chores.len();
    let now_count = views.my_immediate_chores.len();

    vec![
        Sensor::new(
            format!("{username}_my_chores"),
            format!("{username} - My Chores"),
            "mdi:account-check-outline",
            json!(total),
        )
        .unit("chores")
        .attr("username", json!(username))
        .attr("chores", Value::Array(mine))
        .attr("count", json!(total)),
        Sensor::new(
            format!("{username}_my_immediate_chores"),
            format!("{username} - My Immediate Chores"),
            "mdi:clock-alert-outline",
            json!(now_count),
        )
        .unit("chores")
        .attr("username", json!(username))
        .attr("chores", Value::Array(immediate))
        .attr("count", json!(now_count))
        .attr("total_chores", json!(total))
        .attr("complete_later_chores", json!(total - now_count)),
        points_sensor(username, views.user.as_ref(), PointsPeriod::Weekly, label),
        points_sensor(username, views.user.as_ref(), PointsPeriod::AllTime, label),
        arcade_sensor(username, session, tz),
    ]
}

fn points_sensor(username: &str, user: Option<&User>, period: PointsPeriod, label: &str) -> Sensor {
    let (suffix, title) = match period {
        PointsPeriod::Weekly => ("weekly_points", "Weekly Points"),
        PointsPeriod::AllTime => ("alltime_points", "All-Time Points"),
    };
    let points = user.map(|u| period.points_of(u)).unwrap_or(0.0);
    let mut sensor = Sensor::new(
        format!("{username}_{suffix}"),
        format!("{username} - {title}"),
        "mdi:star-circle",
        json!(points),
    )
    .unit(label)
    .attr("username", json!(username));
    if let Some(user) = user {
        sensor = sensor
            .attr("display_name", json!(user.display_name))
            .attr("points", json!(points))
            .attr("weekly_points", json!(user.weekly_points))
            .attr("claims_today", json!(user.claims_today));
    }
    sensor
}

fn arcade_sensor(username: &str, session: Option<&ArcadeSession>, tz: &Tz) -> Sensor {
    let sensor = Sensor::new(
        format!("{username}_arcade_session"),
        format!("{username} - Arcade Session"),
        "mdi:timer-outline",
        json!(session.map(|s| s.status.as_str()).unwrap_or("idle")),
    )
    .attr("username", json!(username))
    .attr("active", json!(session.is_some()));
    match session {
        Some(s) => sensor
            .attr("session_id", json!(s.session_id))
            .attr("chore_id", json!(s.chore_id))
            .attr("chore_name", json!(s.chore_name))
            .attr("started_at", timestamp(s.started_at.as_ref(), tz))
            .attr("elapsed_seconds", json!(s.elapsed_seconds))
            .attr("elapsed", json!(format_duration(s.elapsed_seconds))),
        None => sensor,
    }
}

fn chore_leaderboard_sensor(board: &ChoreLeaderboard) -> Sensor {
    let scores: Vec<Value> = board
        .scores
        .iter()
        .map(|s| {
            json!({
                "rank": s.rank,
                "username": s.user.username,
                "display_name": s.user.display(),
                "time_seconds": s.time_seconds,
                "time_formatted": format_duration(s.time_seconds),
            })
        })
        .collect();
    Sensor::new(
        format!("chore_leaderboard_{}", board.chore_id),
        format!("{} - Arcade Leaderboard", board.chore_name),
        "mdi:podium-gold",
        json!(board.scores.len()),
    )
    .attr("chore_id", json!(board.chore_id))
    .attr("chore_name", json!(board.chore_name))
    .attr("scores", Value::Array(scores))
}
