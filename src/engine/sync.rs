//! Synchronisation with the remote persistence service.
//!
//! The engine updates its local store first and then writes through a
//! [`Remote`]. Changes made by other people arrive as [`PushEvent`]s and are
//! merged by task id.

use serde::{Deserialize, Serialize};

use crate::models::{Comment, Due, Group, Priority, Suggestion, Task, TaskStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Contract of the remote persistence/transport service.
///
/// Writes return `Err` when the service rejected or never received them;
/// the engine then reverts its local copy.
pub trait Remote {
    /// Persist a new task; the returned task is canonical (the service may
    /// assign the id or normalise fields).
    fn create_task(&mut self, draft: &Task) -> Result<Task>;

    /// Apply a partial update to a task.
    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<()>;

    fn delete_task(&mut self, id: &str) -> Result<()>;

    fn list_tasks_by_group(&mut self, group_id: &str) -> Result<Vec<Task>>;

    /// Persist a new group; the returned group is canonical.
    fn create_group(&mut self, draft: &Group) -> Result<Group>;

    fn list_groups(&mut self) -> Result<Vec<Group>>;

    /// Join by invite code. `None` means the service keeps no group
    /// directory and the code must be resolved locally.
    fn join_group(&mut self, code: &str, user_id: &str) -> Result<Option<Group>>;

    fn leave_group(&mut self, group_id: &str, user_id: &str) -> Result<()>;

    fn delete_group(&mut self, group_id: &str) -> Result<()>;

    /// Move a member's points by `delta`. Always a delta, never an absolute
    /// value, so concurrent awards and reversals commute.
    fn apply_score_delta(&mut self, group_id: &str, user_id: &str, delta: i64) -> Result<()>;

    fn publish(&mut self, suggestion: &Suggestion) -> Result<()>;
}

/// Local-only mode: every write is accepted and the local store is the
/// system of record.
#[derive(Debug, Default, Clone)]
pub struct OfflineRemote;

impl Remote for OfflineRemote {
    fn create_task(&mut self, draft: &Task) -> Result<Task> {
        Ok(draft.clone())
    }

    fn update_task(&mut self, _id: &str, _patch: &TaskPatch) -> Result<()> {
        Ok(())
    }

    fn delete_task(&mut self, _id: &str) -> Result<()> {
        Ok(())
    }

    fn list_tasks_by_group(&mut self, _group_id: &str) -> Result<Vec<Task>> {
        Ok(Vec::new())
    }

    fn create_group(&mut self, draft: &Group) -> Result<Group> {
        Ok(draft.clone())
    }

    fn list_groups(&mut self) -> Result<Vec<Group>> {
        Ok(Vec::new())
    }

    fn join_group(&mut self, _code: &str, _user_id: &str) -> Result<Option<Group>> {
        Ok(None)
    }

    fn leave_group(&mut self, _group_id: &str, _user_id: &str) -> Result<()> {
        Ok(())
    }

    fn delete_group(&mut self, _group_id: &str) -> Result<()> {
        Ok(())
    }

    fn apply_score_delta(&mut self, _group_id: &str, _user_id: &str, _delta: i64) -> Result<()> {
        Ok(())
    }

    fn publish(&mut self, _suggestion: &Suggestion) -> Result<()> {
        Ok(())
    }
}

/// Changed fields of a task. `None` means unchanged; for optional fields
/// `Some(None)` means cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postpone_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postpone_reason: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_comments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<Option<u32>>,
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

impl TaskPatch {
    /// Fields that differ between two versions of a task.
    pub fn diff(before: &Task, after: &Task) -> Self {
        Self {
            title: changed(&before.title, &after.title),
            assignees: changed(&before.assignees, &after.assignees),
            category: changed(&before.category, &after.category),
            due: changed(&before.due, &after.due),
            time: changed(&before.time, &after.time),
            priority: changed(&before.priority, &after.priority),
            status: changed(&before.status, &after.status),
            postpone_count: changed(&before.postpone_count, &after.postpone_count),
            postpone_reason: changed(&before.postpone_reason, &after.postpone_reason),
            blocked_by: changed(&before.blocked_by, &after.blocked_by),
            block_reason: changed(&before.block_reason, &after.block_reason),
            comments: changed(&before.comments, &after.comments),
            unread_comments: changed(&before.unread_comments, &after.unread_comments),
            completed_at: changed(&before.completed_at, &after.completed_at),
            completed_by: changed(&before.completed_by, &after.completed_by),
            points_awarded: changed(&before.points_awarded, &after.points_awarded),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a task.
    pub fn apply(&self, task: &mut Task) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    task.$field = value.clone();
                })*
            };
        }
        set!(
            title,
            assignees,
            category,
            due,
            time,
            priority,
            status,
            postpone_count,
            postpone_reason,
            blocked_by,
            block_reason,
            comments,
            unread_comments,
            completed_at,
            completed_by,
            points_awarded
        );
    }
}

/// Events pushed by the remote service.
///
/// ```json
/// {"type": "task-updated", "task": {...}}
/// {"type": "task-deleted", "taskId": "ct-1a2b3c"}
/// {"type": "notification", "notification": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PushEvent {
    TaskCreated {
        task: Box<Task>,
    },
    TaskUpdated {
        task: Box<Task>,
    },
    TaskDeleted {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    Notification {
        notification: Suggestion,
    },
}

impl PushEvent {
    /// Parse one event from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid push event: {}", e)))
    }
}

/// Merge an incoming version of a task with the local copy.
///
/// When the comment thread grew and the newest comment was written by
/// someone other than `viewer_id`, an assignee viewer gets one more unread
/// comment. Replaying the same event counts it again.
///
/// With an edit in flight the local lifecycle fields win and only the
/// comment thread is taken from the incoming version.
pub fn merge_remote_task(
    local: Option<&Task>,
    incoming: Task,
    viewer_id: &str,
    edit_in_flight: bool,
) -> Task {
    let Some(local) = local else {
        return incoming;
    };

    let grew = incoming.comments.len() > local.comments.len();
    let by_other = incoming
        .comments
        .last()
        .is_some_and(|c| c.user_id != viewer_id);
    let unread = if grew && by_other && incoming.is_assignee(viewer_id) {
        local.unread_comments + 1
    } else {
        local.unread_comments
    };

    let mut merged = if edit_in_flight {
        let mut kept = local.clone();
        kept.comments = incoming.comments;
        kept
    } else {
        incoming
    };
    merged.unread_comments = unread;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::task;

    fn comment(id: &str, user_id: &str) -> Comment {
        Comment {
            id: id.into(),
            user: user_id.into(),
            avatar: None,
            user_id: user_id.into(),
            text: "hola".into(),
            timestamp: "05/02 10:00".into(),
        }
    }

    #[test]
    fn test_patch_diff_and_apply() {
        let before = task("ct-1", "u1", &["u1"]);
        let mut after = before.clone();
        after.status = TaskStatus::Blocked;
        after.blocked_by = Some("u1".into());
        after.block_reason = Some("lluvia".into());

        let patch = TaskPatch::diff(&before, &after);
        assert_eq!(patch.status, Some(TaskStatus::Blocked));
        assert_eq!(patch.blocked_by, Some(Some("u1".into())));
        assert!(patch.title.is_none());

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["status"], "blocked");
        assert!(json.get("title").is_none());

        let mut copy = before.clone();
        patch.apply(&mut copy);
        assert_eq!(copy.status, after.status);
        assert_eq!(copy.block_reason, after.block_reason);

        assert!(TaskPatch::diff(&before, &before).is_empty());
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let mut before = task("ct-1", "u1", &["u1"]);
        before.blocked_by = Some("u1".into());
        let mut after = before.clone();
        after.blocked_by = None;
        let patch = TaskPatch::diff(&before, &after);
        assert_eq!(patch.blocked_by, Some(None));
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json["blockedBy"].is_null());
    }

    #[test]
    fn test_push_event_wire_format() {
        let event = PushEvent::from_json(r#"{"type":"task-deleted","taskId":"ct-9"}"#).unwrap();
        assert_eq!(
            event,
            PushEvent::TaskDeleted {
                task_id: "ct-9".into()
            }
        );
        assert!(PushEvent::from_json(r#"{"type":"nope"}"#).is_err());
    }

    #[test]
    fn test_new_comment_from_other_increments_unread() {
        let local = task("ct-1", "u1", &["u1", "u2"]);
        let mut incoming = local.clone();
        incoming.comments.push(comment("c1", "u2"));
        let merged = merge_remote_task(Some(&local), incoming, "u1", false);
        assert_eq!(merged.unread_comments, 1);
        assert_eq!(merged.comments.len(), 1);
    }

    #[test]
    fn test_own_comment_does_not_increment_unread() {
        let local = task("ct-1", "u1", &["u1", "u2"]);
        let mut incoming = local.clone();
        incoming.comments.push(comment("c1", "u1"));
        let merged = merge_remote_task(Some(&local), incoming, "u1", false);
        assert_eq!(merged.unread_comments, 0);
    }

    #[test]
    fn test_non_assignee_viewer_not_counted() {
        let local = task("ct-1", "u1", &["u1"]);
        let mut incoming = local.clone();
        incoming.comments.push(comment("c1", "u1"));
        let merged = merge_remote_task(Some(&local), incoming, "watcher", false);
        assert_eq!(merged.unread_comments, 0);
    }

    #[test]
    fn test_in_flight_edit_keeps_local_lifecycle() {
        let mut local = task("ct-1", "u1", &["u1", "u2"]);
        local.status = TaskStatus::WaitingValidation;
        let mut incoming = task("ct-1", "u1", &["u1", "u2"]);
        incoming.comments.push(comment("c1", "u2"));

        let merged = merge_remote_task(Some(&local), incoming, "u1", true);
        assert_eq!(merged.status, TaskStatus::WaitingValidation);
        assert_eq!(merged.comments.len(), 1);
        assert_eq!(merged.unread_comments, 1);
    }

    #[test]
    fn test_unknown_task_taken_as_is() {
        let incoming = task("ct-1", "u1", &["u1"]);
        let merged = merge_remote_task(None, incoming.clone(), "u1", false);
        assert_eq!(merged, incoming);
    }
}
