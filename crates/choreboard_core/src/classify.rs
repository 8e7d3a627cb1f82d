//! crates/choreboard_core/src/classify.rs
//!
//! Assigns every chore to exactly one view category.

use crate::domain::{Chore, ChoreStatus};
use crate::time::{is_due_today, start_of_day};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Unassigned and claimable.
    Pool,
    /// Not terminal and due before today.
    Late,
    /// Not terminal and due by the end of today.
    Outstanding,
    /// Future due date, terminal status, no due date or no status.
    Excluded,
}

/// Classifies `chore` relative to `now`.
///
/// Checks run in priority order: pool, late, outstanding. Lateness is measured
/// against the start of `now`'s calendar day, so anything due today is still
/// outstanding until the day is over.
pub fn classify(chore: &Chore, now: &DateTime<Tz>) -> Classification {
    let Some(status) = chore.status.as_ref() else {
        warn!(chore_id = chore.id, name = %chore.name, "Chore has no status, excluding it from all views");
        return Classification::Excluded;
    };

    if *status == ChoreStatus::Pool || (chore.is_pool && chore.assignee.is_none()) {
        return Classification::Pool;
    }

    if status.is_terminal() {
        return Classification::Excluded;
    }

    let Some(due_at) = chore.due_at.as_ref() else {
        return Classification::Excluded;
    };

    if *due_at < late_cutoff(now) {
        Classification::Late
    } else if is_due_today(due_at, now) {
        Classification::Outstanding
    } else {
        Classification::Excluded
    }
}

fn late_cutoff(now: &DateTime<Tz>) -> DateTime<Utc> {
    start_of_day(now).with_timezone(&Utc)
}

/// Non-terminal chores assigned to `username`, in input order, whatever their due date.
pub fn my_chores<'a>(chores: &'a [Chore], username: &str) -> Vec<&'a Chore> {
    chores
        .iter()
        .filter(|chore| chore.status.is_some() && !chore.is_terminal())
        .filter(|chore| chore.is_assigned_to(username))
        .collect()
}

/// The subset of `my_chores` not flagged "complete later".
pub fn my_immediate_chores<'a>(chores: &'a [Chore], username: &str) -> Vec<&'a Chore> {
    my_chores(chores, username)
        .into_iter()
        .filter(|chore| !chore.complete_later)
        .collect()
}
