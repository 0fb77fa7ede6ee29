//! Data models for Crewtask entities.
//!
//! This module defines the core data structures:
//! - `Task` - Work items with lifecycle status, due date, and reward points
//! - `Comment` - Entries in a task's comment thread
//! - `Group` - Collaboration spaces owning tasks and a points ledger
//! - `User` - Cached identity of a person referenced by id
//! - `Suggestion` - Routed notification feed entries (see [`notification`])

pub mod date_text;
pub mod notification;
pub mod scoring;

pub use notification::{Suggestion, SuggestionKind};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category label that earns the highest urgency and reward bonuses.
pub const CATEGORY_CRITICAL: &str = "Crítico";
/// Audit work category.
pub const CATEGORY_AUDIT: &str = "Auditoría";
/// Maintenance work category.
pub const CATEGORY_MAINTENANCE: &str = "Mantención";

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Parse a priority from a string (English or Spanish, case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match date_text::fold(s).as_str() {
            "low" | "baja" => Some(Self::Low),
            "medium" | "media" => Some(Self::Medium),
            "high" | "alta" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task status in the lifecycle.
///
/// `Upcoming` and `Pending` are the open states; `Blocked` and
/// `WaitingValidation` are side branches; `Completed` is terminal until a
/// restore brings the task back to `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Upcoming,
    #[default]
    Pending,
    Blocked,
    WaitingValidation,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Pending => "pending",
            Self::Blocked => "blocked",
            Self::WaitingValidation => "waiting_validation",
            Self::Completed => "completed",
        }
    }

    /// Pending or upcoming: the states from which work can be finished.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Upcoming)
    }

    /// Initial status for a freshly created task: upcoming when the due
    /// date lies strictly after `today`, pending otherwise.
    pub fn initial(due: &Due, today: NaiveDate) -> Self {
        match due.resolve(today) {
            Some(date) if date > today => Self::Upcoming,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level workspace partition a group (and its tasks) belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    Work,
    Personal,
}

impl Context {
    pub fn parse(s: &str) -> Option<Self> {
        match date_text::fold(s).as_str() {
            "work" | "trabajo" => Some(Self::Work),
            "personal" => Some(Self::Personal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a task is due.
///
/// Stored as a plain string: one of the relative sentinels, an ISO
/// calendar date, or arbitrary text that could not be understood. The
/// latter is kept verbatim and never resolves to a date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Due {
    #[default]
    Today,
    Tomorrow,
    Yesterday,
    Date(NaiveDate),
    Unparsed(String),
}

impl Due {
    /// Parse a due value. Sentinels are accepted in English or Spanish,
    /// ignoring case and accents.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match date_text::fold(trimmed).as_str() {
            "today" | "hoy" => return Self::Today,
            "tomorrow" | "manana" => return Self::Tomorrow,
            "yesterday" | "ayer" => return Self::Yesterday,
            _ => {}
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Self::Date(date),
            Err(_) => Self::Unparsed(trimmed.to_string()),
        }
    }

    /// Resolve to a calendar date relative to `today`.
    pub fn resolve(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Tomorrow => Some(today + Duration::days(1)),
            Self::Yesterday => Some(today - Duration::days(1)),
            Self::Date(date) => Some(*date),
            Self::Unparsed(_) => None,
        }
    }
}

impl From<String> for Due {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Due> for String {
    fn from(due: Due) -> Self {
        due.to_string()
    }
}

impl fmt::Display for Due {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => write!(f, "Today"),
            Self::Tomorrow => write!(f, "Tomorrow"),
            Self::Yesterday => write!(f, "Yesterday"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unparsed(raw) => write!(f, "{}", raw),
        }
    }
}

/// A comment in a task's thread. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,

    /// Display name of the author at the time of writing
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    pub user_id: String,

    pub text: String,

    /// Human-readable timestamp label (e.g., "05/02 14:30")
    pub timestamp: String,
}

/// A unit of work tracked by Crewtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (e.g., "ct-a1b2")
    pub id: String,

    /// Owning group
    pub group_id: String,

    pub title: String,

    pub creator_id: String,

    /// Never empty once set
    pub assignees: Vec<String>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub due: Due,

    /// Optional display time ("HH:MM")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub postpone_count: u32,

    /// Who blocked the task, or who requested validation while the task
    /// is waiting for it. Present iff `block_reason` is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    /// Reason given for the most recent postponement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postpone_reason: Option<String>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub unread_comments: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,

    /// Present iff the task is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<u32>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task assigned to its creator, due today.
    pub fn new(id: String, group_id: String, title: String, creator_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            group_id,
            title,
            assignees: vec![creator_id.clone()],
            creator_id,
            category: String::new(),
            due: Due::Today,
            time: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            postpone_count: 0,
            blocked_by: None,
            block_reason: None,
            postpone_reason: None,
            comments: Vec::new(),
            unread_comments: 0,
            completed_at: None,
            completed_by: None,
            points_awarded: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assignee(&self, user_id: &str) -> bool {
        self.assignees.iter().any(|a| a == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    /// Resolved due date, if the due value is understood.
    pub fn due_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.due.resolve(today)
    }

    /// Not completed and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed
            && self.due_date(today).is_some_and(|due| due < today)
    }

    /// Clear the blocked-by/reason pair together.
    pub fn clear_block(&mut self) {
        self.blocked_by = None;
        self.block_reason = None;
    }
}

/// A named collaboration space owning tasks and a reward-points ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: Context,

    /// Member user ids, in join order
    #[serde(default)]
    pub members: Vec<String>,

    pub creator_id: String,

    /// Accumulated reward points per member
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,

    pub invite_code: String,

    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Create a new group whose only member is its creator.
    pub fn new(
        id: String,
        name: String,
        kind: Context,
        creator_id: String,
        invite_code: String,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            members: vec![creator_id.clone()],
            creator_id,
            scores: BTreeMap::new(),
            invite_code,
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Add a member. Returns false if already present.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        true
    }

    /// Remove a member. Returns false if not present.
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != user_id);
        self.members.len() != before
    }

    /// Apply a signed delta to a member's ledger entry.
    ///
    /// The ledger only ever moves by deltas so that awards and reversals
    /// arriving in any order still sum to the same total.
    pub fn apply_points(&mut self, user_id: &str, delta: i64) {
        *self.scores.entry(user_id.to_string()).or_insert(0) += delta;
    }

    pub fn points(&self, user_id: &str) -> i64 {
        self.scores.get(user_id).copied().unwrap_or(0)
    }

    /// Members with their points, highest first; ties by user id.
    pub fn leaderboard(&self) -> Vec<(String, i64)> {
        let mut board: Vec<(String, i64)> = self
            .members
            .iter()
            .map(|m| (m.clone(), self.points(m)))
            .collect();
        board.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        board
    }
}

/// Cached identity of a user. Owned by the auth collaborator; kept here
/// only so names can be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            email: None,
        }
    }
}

/// Which groups are in view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
    /// Every group in the active context
    All,
    /// Exactly one group
    Group(String),
}

impl GroupScope {
    /// Parse `"all"` or a group id.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Group(s.to_string())
        }
    }
}

/// The viewer's active selection: a group (or all groups) within a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub group: GroupScope,
    pub context: Context,
}

impl Scope {
    pub fn new(group: GroupScope, context: Context) -> Self {
        Self { group, context }
    }

    /// All groups of a context.
    pub fn all(context: Context) -> Self {
        Self::new(GroupScope::All, context)
    }

    /// Whether something owned by `group_id` is in view. `groups` is used
    /// to look up the context of the owning group when scoped to all.
    pub fn includes(&self, group_id: &str, groups: &[Group]) -> bool {
        match &self.group {
            GroupScope::Group(id) => id == group_id,
            GroupScope::All => groups
                .iter()
                .any(|g| g.id == group_id && g.kind == self.context),
        }
    }
}
