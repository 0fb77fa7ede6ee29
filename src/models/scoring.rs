//! Urgency ranking and completion rewards.
//!
//! Two independent additive scores:
//! - **Urgency** ranks tasks for the daily summary. It is never stored or shown.
//! - **Reward points** are computed once, when a task is completed, and
//!   credited to the completer in the group ledger.
//!
//! Both evaluate the due date against "today" at day granularity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CATEGORY_AUDIT, CATEGORY_CRITICAL, CATEGORY_MAINTENANCE, Due, Priority, Task, TaskStatus};

/// Ranking score; higher means more urgent.
pub fn urgency_score(task: &Task, today: NaiveDate) -> i32 {
    let priority = match task.priority {
        Priority::High => 30,
        Priority::Medium => 15,
        Priority::Low => 5,
    };

    let status = if task.is_overdue(today) {
        40
    } else {
        match task.status {
            TaskStatus::Blocked => 25,
            TaskStatus::WaitingValidation => 20,
            TaskStatus::Pending => 10,
            TaskStatus::Upcoming | TaskStatus::Completed => 0,
        }
    };

    let proximity = match &task.due {
        Due::Today => 30,
        Due::Tomorrow => 25,
        Due::Yesterday => 35,
        Due::Date(due) => match (*due - today).num_days() {
            d if d < 0 => 35,
            0 => 30,
            1 => 25,
            d if d <= 3 => 20,
            d if d <= 7 => 15,
            d if d <= 14 => 10,
            _ => 5,
        },
        Due::Unparsed(_) => 0,
    };

    let category = match task.category.as_str() {
        CATEGORY_CRITICAL => 15,
        CATEGORY_AUDIT => 12,
        CATEGORY_MAINTENANCE => 8,
        _ => 0,
    };

    let postponed = match task.postpone_count {
        0 => 0,
        1 => 4,
        2 => 7,
        _ => 10,
    };

    let shared = if task.assignees.len() > 1 { 5 } else { 0 };

    priority + status + proximity + category + postponed + shared
}

/// Rank tasks by urgency, most urgent first. Equal scores keep input order.
pub fn rank_by_urgency(tasks: &[Task], today: NaiveDate) -> Vec<RankedTask<'_>> {
    let mut ranked: Vec<RankedTask<'_>> = tasks
        .iter()
        .map(|task| RankedTask {
            task,
            score: urgency_score(task, today),
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// A task paired with its urgency score.
#[derive(Debug, Clone, Copy)]
pub struct RankedTask<'a> {
    pub task: &'a Task,
    pub score: i32,
}

/// Itemised reward computation, kept so callers can explain the total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub base: i32,
    pub timeliness: i32,
    pub category: i32,
    pub postponements: i32,
    pub collaboration: i32,
    /// Rounded sum, floored at zero
    pub total: u32,
}

/// Reward for completing `task` on `today`, itemised.
pub fn points_breakdown(task: &Task, today: NaiveDate) -> PointsBreakdown {
    let base: i32 = match task.priority {
        Priority::High => 50,
        Priority::Medium => 30,
        Priority::Low => 15,
    };

    // Positive = days late, negative = days early
    let timeliness = match task.due_date(today).map(|due| (today - due).num_days()) {
        None => 0,
        Some(0) => 10,
        Some(-1) => 20,
        Some(d) if (-3..=-2).contains(&d) => 15,
        Some(d) if (-7..=-4).contains(&d) => 10,
        Some(d) if d < -7 => 5,
        Some(1) => -10,
        Some(d) if (2..=3).contains(&d) => -20,
        Some(d) if (4..=7).contains(&d) => -30,
        Some(_) => -50,
    };

    let category = match task.category.as_str() {
        CATEGORY_CRITICAL => 25,
        CATEGORY_AUDIT => 20,
        CATEGORY_MAINTENANCE => 10,
        "" => 0,
        _ => 5,
    };

    let postponements = i32::try_from(-5 * i64::from(task.postpone_count)).unwrap_or(i32::MIN);

    let collaboration = if task.assignees.len() > 1 { 15 } else { 0 };

    let sum = (base + timeliness + category + collaboration).saturating_add(postponements);

    PointsBreakdown {
        base,
        timeliness,
        category,
        postponements,
        collaboration,
        total: u32::try_from(sum.max(0)).unwrap_or(0),
    }
}

/// Reward points for completing `task` on `today`; never negative.
pub fn reward_points(task: &Task, today: NaiveDate) -> u32 {
    points_breakdown(task, today).total
}
