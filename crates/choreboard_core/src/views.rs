//! crates/choreboard_core/src/views.rs
//!
//! Groups classified chores into the named views and computes the summary
//! statistics served as sensors. Pure: no I/O, no state between calls.

use crate::classify::{classify, my_chores, my_immediate_chores, Classification};
use crate::domain::{Chore, RankedUser, Snapshot, User};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsPeriod {
    Weekly,
    AllTime,
}

impl PointsPeriod {
    pub fn points_of(self, user: &User) -> f64 {
        match self {
            PointsPeriod::Weekly => user.weekly_points,
            PointsPeriod::AllTime => user.all_time_points,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ViewCounts {
    pub outstanding: usize,
    pub late: usize,
    pub pool: usize,
}

/// Pool vs. assigned split over every chore that carries a status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub total: usize,
    pub pool: usize,
    pub assigned: usize,
    pub other: usize,
    pub pool_percentage: f64,
    pub assigned_percentage: f64,
    pub other_percentage: f64,
    pub status_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserViews {
    pub user: Option<User>,
    pub my_chores: Vec<Chore>,
    pub my_immediate_chores: Vec<Chore>,
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewSet {
    pub outstanding: Vec<Chore>,
    pub late: Vec<Chore>,
    pub pool: Vec<Chore>,
    pub counts: ViewCounts,
    pub breakdown: Breakdown,
    pub weekly_leaderboard: Vec<RankedUser>,
    pub alltime_leaderboard: Vec<RankedUser>,
    /// Keyed by monitored username.
    pub per_user: BTreeMap<String, UserViews>,
}

/// Derives every view from `snapshot` as of `now`.
pub fn build_views(snapshot: &Snapshot, monitored_users: &[String], now: &DateTime<Tz>) -> ViewSet {
    let mut outstanding = Vec::new();
    let mut late = Vec::new();
    let mut pool = Vec::new();
    let mut classifications = Vec::with_capacity(snapshot.chores.len());

    for chore in &snapshot.chores {
        let class = classify(chore, now);
        match class {
            Classification::Pool => pool.push(chore.clone()),
            Classification::Late => late.push(chore.clone()),
            Classification::Outstanding => outstanding.push(chore.clone()),
            Classification::Excluded => {}
        }
        classifications.push(class);
    }

    let per_user = monitored_users
        .iter()
        .map(|username| {
            let views = UserViews {
                user: snapshot
                    .users
                    .iter()
                    .find(|user| &user.username == username)
                    .cloned(),
                my_chores: my_chores(&snapshot.chores, username)
                    .into_iter()
                    .cloned()
                    .collect(),
                my_immediate_chores: my_immediate_chores(&snapshot.chores, username)
                    .into_iter()
                    .cloned()
                    .collect(),
            };
            (username.clone(), views)
        })
        .collect();

    ViewSet {
        counts: ViewCounts {
            outstanding: outstanding.len(),
            late: late.len(),
            pool: pool.len(),
        },
        breakdown: breakdown(&snapshot.chores, &classifications),
        weekly_leaderboard: leaderboard(&snapshot.users, PointsPeriod::Weekly),
        alltime_leaderboard: leaderboard(&snapshot.users, PointsPeriod::AllTime),
        outstanding,
        late,
        pool,
        per_user,
    }
}

/// Computes the pool/assigned split. `classifications[i]` belongs to `chores[i]`.
pub fn breakdown(chores: &[Chore], classifications: &[Classification]) -> Breakdown {
    let mut result = Breakdown::default();

    for (chore, class) in chores.iter().zip(classifications) {
        let Some(status) = chore.status.as_ref() else {
            continue;
        };
        result.total += 1;
        *result
            .status_breakdown
            .entry(status.as_str().to_string())
            .or_insert(0) += 1;

        if *class == Classification::Pool {
            result.pool += 1;
        } else if chore.assignee.is_some() {
            result.assigned += 1;
        } else {
            result.other += 1;
        }
    }

    if result.total > 0 {
        result.pool_percentage = percentage(result.pool, result.total);
        result.assigned_percentage = percentage(result.assigned, result.total);
        result.other_percentage =
            round_one_decimal(100.0 - result.pool_percentage - result.assigned_percentage);
    }

    result
}

/// Ranks users by the period's points, highest first. Ties keep input order.
pub fn leaderboard(users: &[User], period: PointsPeriod) -> Vec<RankedUser> {
    let mut ordered: Vec<&User> = users.iter().collect();
    // `sort_by` is stable, which gives the first-seen tiebreak.
    ordered.sort_by(|a, b| period.points_of(b).total_cmp(&period.points_of(a)));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, user)| RankedUser {
            rank: index + 1,
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            points: period.points_of(user),
        })
        .collect()
}

fn percentage(part: usize, total: usize) -> f64 {
    round_one_decimal(part as f64 * 100.0 / total as f64)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
