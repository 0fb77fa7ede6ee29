//! Notification feed entries ("suggestions").
//!
//! Each suggestion carries the routing fields shared by every kind
//! (owning group, optional target viewer, read flag, display text) and a
//! [`SuggestionKind`] holding only the fields that kind needs. The kind is
//! serialized inline with a `type` tag:
//!
//! ```json
//! {"id": "cts-1a2b", "groupId": "ctg-9f00", "type": "system_alert", "taskId": "ct-77aa", ...}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a suggestion is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SuggestionKind {
    /// An inbound email surfaced in the feed
    Email {
        sender: String,
        /// Kept apart from the suggestion's own subject line
        #[serde(rename = "emailSubject")]
        subject: String,
    },

    /// Engine-generated alert about a task (e.g., repeated postponement)
    SystemAlert { task_id: String },

    /// Alert raised by an external equipment monitor
    EquipmentAlert {
        equipment: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// A member left the group
    MemberLeft { member_id: String },

    /// A task is waiting for someone other than the requester to validate it
    ValidationRequest { task_id: String, requested_by: String },

    /// A new comment on a task. Never shown in the feed.
    Comment { task_id: String },

    /// A user was mentioned in a task comment
    Mention { task_id: String, mentioned_by: String },
}

impl SuggestionKind {
    /// The `type` tag as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email { .. } => "email",
            Self::SystemAlert { .. } => "system_alert",
            Self::EquipmentAlert { .. } => "equipment_alert",
            Self::MemberLeft { .. } => "member_left",
            Self::ValidationRequest { .. } => "validation_request",
            Self::Comment { .. } => "comment",
            Self::Mention { .. } => "mention",
        }
    }

    /// Back-reference to the task this suggestion is about, if any.
    pub fn related_task_id(&self) -> Option<&str> {
        match self {
            Self::SystemAlert { task_id }
            | Self::ValidationRequest { task_id, .. }
            | Self::Comment { task_id }
            | Self::Mention { task_id, .. } => Some(task_id),
            Self::Email { .. } | Self::EquipmentAlert { .. } | Self::MemberLeft { .. } => None,
        }
    }
}

/// A routed entry in a viewer's notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,

    pub group_id: String,

    /// When set, only this viewer sees the suggestion, whatever group is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub subject: String,

    pub context: String,

    pub suggested_action: String,

    #[serde(default)]
    pub read: bool,

    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: SuggestionKind,
}

impl Suggestion {
    /// Create an unread, untargeted suggestion.
    pub fn new(
        id: String,
        group_id: String,
        kind: SuggestionKind,
        subject: impl Into<String>,
        context: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        Self {
            id,
            group_id,
            user_id: None,
            subject: subject.into(),
            context: context.into(),
            suggested_action: suggested_action.into(),
            read: false,
            created_at: Utc::now(),
            kind,
        }
    }

    /// Target a single viewer.
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn related_task_id(&self) -> Option<&str> {
        self.kind.related_task_id()
    }

    /// Whether this is the repeated-postponement alert for `task_id`.
    pub fn is_system_alert_for(&self, task_id: &str) -> bool {
        matches!(&self.kind, SuggestionKind::SystemAlert { task_id: t } if t == task_id)
    }
}
