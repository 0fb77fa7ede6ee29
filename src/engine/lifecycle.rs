//! Task lifecycle transitions.
//!
//! ```text
//!              postpone                     block
//!   upcoming <---------- pending/upcoming ----------> blocked
//!                 |            |                         |
//!        (shared) |            | (sole owner)    unblock |
//!                 v            v                         v
//!      waiting_validation --> completed              pending
//!                                |
//!                        restore v
//!                             pending
//! ```
//!
//! Every function here validates first and mutates second: an `Err` or an
//! `Unavailable` outcome leaves the task untouched. Ledger movements are
//! returned to the caller rather than applied, since the ledger lives on
//! the group.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::scoring::reward_points;
use crate::models::{Due, Task, TaskStatus};
use crate::{Error, Result};

/// `block_reason` while a task waits for a peer to validate it.
pub const AWAITING_VALIDATION: &str = "awaiting peer validation";

/// Postpone count at which a coordination alert is raised.
pub const POSTPONE_ALERT_THRESHOLD: u32 = 2;

/// What a lifecycle action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Completed { points: u32 },
    ValidationRequested,
    Postponed { count: u32 },
    Blocked,
    Unblocked,
    Restored,
    /// Main action on a completed task: the caller must collect new
    /// assignees and a due date, then confirm the restore.
    RestoreRequired,
    /// The action does not apply in the task's current state.
    Unavailable { reason: String },
}

impl ActionOutcome {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether the task was changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::RestoreRequired | Self::Unavailable { .. })
    }
}

/// A signed change to one member's ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerDelta {
    pub user_id: String,
    pub delta: i64,
}

/// Result of a lifecycle function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub outcome: ActionOutcome,
    /// Points to credit or debit in the owning group's ledger
    pub ledger: Option<LedgerDelta>,
    /// The postpone count just reached the alert threshold
    pub postpone_alert: bool,
}

impl Transition {
    fn new(outcome: ActionOutcome) -> Self {
        Self {
            outcome,
            ledger: None,
            postpone_alert: false,
        }
    }
}

/// New assignees and due date supplied when restoring a completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub assignees: Vec<String>,
    pub due: Due,
    pub time: Option<String>,
}

/// The primary action on a task, performed by `actor`.
///
/// - blocked: unavailable (only unblock applies)
/// - completed: asks for a restore
/// - waiting_validation: completes, unless `actor` requested the validation
/// - pending/upcoming: requests validation when the task is shared or the
///   actor is an assignee other than the creator; completes otherwise
pub fn main_action(
    task: &mut Task,
    actor: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Transition> {
    match task.status {
        TaskStatus::Blocked => Ok(Transition::new(ActionOutcome::unavailable(
            "task is blocked; unblock it first",
        ))),
        TaskStatus::Completed => Ok(Transition::new(ActionOutcome::RestoreRequired)),
        TaskStatus::WaitingValidation => {
            if task.blocked_by.as_deref() == Some(actor) {
                return Err(Error::SelfValidation(format!(
                    "{} requested validation of {}",
                    actor, task.id
                )));
            }
            require_participant(task, actor)?;
            Ok(complete(task, actor, today, now))
        }
        TaskStatus::Pending | TaskStatus::Upcoming => {
            require_participant(task, actor)?;
            let is_assignee = task.is_assignee(actor);
            let is_creator = task.is_creator(actor);
            if task.assignees.len() > 1 || (is_assignee && !is_creator) {
                task.status = TaskStatus::WaitingValidation;
                task.blocked_by = Some(actor.to_string());
                task.block_reason = Some(AWAITING_VALIDATION.to_string());
                task.updated_at = now;
                Ok(Transition::new(ActionOutcome::ValidationRequested))
            } else {
                Ok(complete(task, actor, today, now))
            }
        }
    }
}

/// Only assignees and the creator may finish a task.
fn require_participant(task: &Task, actor: &str) -> Result<()> {
    if task.is_assignee(actor) || task.is_creator(actor) {
        return Ok(());
    }
    Err(Error::Permission(format!(
        "{} is neither an assignee nor the creator of {}",
        actor, task.id
    )))
}

fn complete(task: &mut Task, actor: &str, today: NaiveDate, now: DateTime<Utc>) -> Transition {
    let points = reward_points(task, today);
    task.status = TaskStatus::Completed;
    task.completed_at = Some(now);
    task.completed_by = Some(actor.to_string());
    task.points_awarded = Some(points);
    task.clear_block();
    task.updated_at = now;

    let mut transition = Transition::new(ActionOutcome::Completed { points });
    transition.ledger = Some(LedgerDelta {
        user_id: actor.to_string(),
        delta: i64::from(points),
    });
    transition
}

/// Push the task to tomorrow.
///
/// The first postponement needs no reason; later ones do.
pub fn postpone(task: &mut Task, reason: Option<&str>, now: DateTime<Utc>) -> Result<Transition> {
    if !task.status.is_open() {
        return Ok(Transition::new(ActionOutcome::unavailable(format!(
            "cannot postpone a {} task",
            task.status
        ))));
    }

    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    if task.postpone_count >= 1 && reason.is_none() {
        return Err(Error::Validation(
            "a reason is required to postpone a task more than once".to_string(),
        ));
    }

    task.due = Due::Tomorrow;
    task.status = TaskStatus::Upcoming;
    task.postpone_count = task.postpone_count.saturating_add(1);
    task.postpone_reason = reason.map(str::to_string);
    task.updated_at = now;

    let mut transition = Transition::new(ActionOutcome::Postponed {
        count: task.postpone_count,
    });
    transition.postpone_alert = task.postpone_count == POSTPONE_ALERT_THRESHOLD;
    Ok(transition)
}

/// Block the task with a reason.
pub fn block(task: &mut Task, actor: &str, reason: &str, now: DateTime<Utc>) -> Result<Transition> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::Validation(
            "a reason is required to block a task".to_string(),
        ));
    }
    if matches!(task.status, TaskStatus::Blocked | TaskStatus::Completed) {
        return Ok(Transition::new(ActionOutcome::unavailable(format!(
            "cannot block a {} task",
            task.status
        ))));
    }

    task.status = TaskStatus::Blocked;
    task.blocked_by = Some(actor.to_string());
    task.block_reason = Some(reason.to_string());
    task.updated_at = now;
    Ok(Transition::new(ActionOutcome::Blocked))
}

/// Clear a block and return the task to pending.
pub fn unblock(task: &mut Task, now: DateTime<Utc>) -> Transition {
    if task.status != TaskStatus::Blocked {
        return Transition::new(ActionOutcome::unavailable(format!(
            "task is {}, not blocked",
            task.status
        )));
    }

    task.status = TaskStatus::Pending;
    task.clear_block();
    task.updated_at = now;
    Transition::new(ActionOutcome::Unblocked)
}

/// Reopen a completed task with new assignees and due date.
///
/// The points recorded at completion are debited from whoever earned them.
pub fn restore(task: &mut Task, request: RestoreRequest, now: DateTime<Utc>) -> Result<Transition> {
    if task.status != TaskStatus::Completed {
        return Ok(Transition::new(ActionOutcome::unavailable(format!(
            "task is {}, not completed",
            task.status
        ))));
    }

    let assignees = dedup(request.assignees);
    if assignees.is_empty() {
        return Err(Error::Validation(
            "at least one assignee is required to restore a task".to_string(),
        ));
    }

    let ledger = match (task.completed_by.take(), task.points_awarded.take()) {
        (Some(user_id), Some(points)) => Some(LedgerDelta {
            user_id,
            delta: -i64::from(points),
        }),
        _ => None,
    };

    task.status = TaskStatus::Pending;
    task.completed_at = None;
    task.assignees = assignees;
    task.due = request.due;
    task.time = request.time;
    task.updated_at = now;

    let mut transition = Transition::new(ActionOutcome::Restored);
    transition.ledger = ledger;
    Ok(transition)
}

/// Drop blank and repeated ids, keeping first occurrences in order.
pub fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
