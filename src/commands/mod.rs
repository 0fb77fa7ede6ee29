//! Command implementations for the `ct` CLI.
//!
//! Each command returns a result type implementing [`Output`], printed as
//! JSON by default or as text with `-H`. Commands are grouped by area:
//! - system and config
//! - users and groups
//! - tasks and comments
//! - summaries, reports and the feed

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::action_log::{self, ActionLog};
use crate::config::{
    CrewtaskConfig, ResolvedConfig, data_config_path, read_config, system_config_path,
    write_config,
};
use crate::engine::summary::Summary;
use crate::engine::{
    ActionOutcome, ActionResult, Clock, CommentAdded, Engine, FixedGreeting, GreetingSource,
    GroupDeleted, GroupLeft, LeaderboardEntry, OfflineRemote, PinnedDate, PushEvent,
    RandomGreeting, RestoreRequest, SystemClock, TaskDraft, WeeklyReport,
};
use crate::models::date_text::{detect_date_from_text, detect_time_from_text};
use crate::models::scoring::{PointsBreakdown, points_breakdown, rank_by_urgency, urgency_score};
use crate::models::{
    Context, Due, Group, GroupScope, Priority, Scope, Suggestion, Task, TaskStatus, User,
};
use crate::storage::{FileBackend, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    fn to_json(&self) -> String;
    fn to_human(&self) -> String;
}

/// `Output::to_json` for any serializable result.
macro_rules! json_output {
    ($($ty:ty => $human:expr),* $(,)?) => {
        $(impl Output for $ty {
            fn to_json(&self) -> String {
                serde_json::to_string(self).unwrap_or_default()
            }

            fn to_human(&self) -> String {
                let render: fn(&$ty) -> String = $human;
                render(self)
            }
        })*
    };
}

/// Engine backed by the data directory, in local-only mode.
pub type CliEngine = Engine<Storage<FileBackend>, OfflineRemote>;

/// Everything a command needs to know about its invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub data_dir: PathBuf,
    pub config: ResolvedConfig,
    /// Pinned "today", if given
    pub today: Option<NaiveDate>,
}

impl Session {
    pub fn new(data_dir: PathBuf, config: ResolvedConfig, today: Option<NaiveDate>) -> Self {
        Self {
            data_dir,
            config,
            today,
        }
    }

    /// User id commands act as.
    pub fn viewer(&self) -> &str {
        self.config.viewer()
    }

    /// Scope for a `--group` argument within the active context.
    pub fn scope(&self, group: &str) -> Scope {
        Scope::new(GroupScope::parse(group), self.config.context())
    }

    pub fn engine(&self) -> Result<CliEngine> {
        let storage = Storage::open(&self.data_dir)?;
        let clock: Box<dyn Clock> = match self.today {
            Some(date) => Box::new(PinnedDate(date)),
            None => Box::new(SystemClock),
        };
        Ok(Engine::new(storage, OfflineRemote, clock))
    }
}

/// Parse a `--today` value.
pub fn parse_today(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("invalid date {} (expected YYYY-MM-DD)", s)))
}

fn parse_context(s: &str) -> Result<Context> {
    Context::parse(s)
        .ok_or_else(|| Error::InvalidInput(format!("context must be work or personal, got {}", s)))
}

fn parse_priority(s: &str) -> Result<Priority> {
    Priority::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!("priority must be low, medium or high, got {}", s))
    })
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| Error::InvalidInput(format!("unknown status {}", s)))
}

fn task_line(task: &Task) -> String {
    let time = task
        .time
        .as_deref()
        .map(|t| format!(" {}", t))
        .unwrap_or_default();
    format!(
        "[{}] {} {} (due {}{}, {}, {})",
        task.status,
        task.id,
        task.title,
        task.due,
        time,
        task.priority,
        task.assignees.join(", ")
    )
}

fn suggestion_line(s: &Suggestion) -> String {
    format!("{} [{}] {}: {}", s.id, s.kind.as_str(), s.subject, s.suggested_action)
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub data_dir: String,
    /// False when the directory was already initialized
    pub initialized: bool,
}

json_output!(InitResult => |r| if r.initialized {
    format!("Initialized crewtask data in {}", r.data_dir)
} else {
    format!("Already initialized at {}", r.data_dir)
});

pub fn system_init(data_dir: &Path) -> Result<InitResult> {
    let existed = Storage::exists(data_dir);
    Storage::init(data_dir)?;
    Ok(InitResult {
        data_dir: data_dir.display().to_string(),
        initialized: !existed,
    })
}

#[derive(Debug, Serialize)]
pub struct CompactResult {
    pub location: String,
    pub backend: String,
    /// Records kept per collection
    pub records: BTreeMap<String, usize>,
}

json_output!(CompactResult => |r| {
    let mut lines = vec![format!("Compacted {} storage at {}:", r.backend, r.location)];
    lines.extend(r.records.iter().map(|(k, v)| format!("  {} {}", k, v)));
    lines.join("\n")
});

pub fn system_compact(data_dir: &Path) -> Result<CompactResult> {
    let mut storage = Storage::open(data_dir)?;
    let mut records = BTreeMap::new();
    records.insert("tasks".to_string(), storage.compact::<Task>()?);
    records.insert("groups".to_string(), storage.compact::<Group>()?);
    records.insert("suggestions".to_string(), storage.compact::<Suggestion>()?);
    records.insert("users".to_string(), storage.compact::<User>()?);
    Ok(CompactResult {
        location: storage.location(),
        backend: storage.backend_type().to_string(),
        records,
    })
}

#[derive(Debug, Serialize)]
pub struct ActionLogList {
    pub entries: Vec<ActionLog>,
}

json_output!(ActionLogList => |r| {
    if r.entries.is_empty() {
        return "No actions logged.".to_string();
    }
    r.entries
        .iter()
        .map(|e| {
            format!(
                "{} {} {} {} ({}ms)",
                e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                e.user,
                e.command,
                if e.success { "ok" } else { "FAILED" },
                e.duration_ms
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
});

/// The most recent `limit` action log entries, oldest first.
pub fn system_log(data_dir: &Path, limit: usize) -> Result<ActionLogList> {
    let mut entries = action_log::read_log(data_dir)?;
    let skip = entries.len().saturating_sub(limit);
    entries.drain(..skip);
    Ok(ActionLogList { entries })
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
    pub system_path: Option<String>,
    pub data_path: String,
}

json_output!(ConfigShow => |r| {
    let c = &r.config;
    let mut lines = vec![
        format!("viewer = {} ({})", c.viewer.value, c.viewer.source),
        format!("context = {} ({})", c.context.value, c.context.source),
        format!("output-format = {} ({})", c.output_format.value, c.output_format.source),
        format!("default-priority = {} ({})", c.default_priority.value, c.default_priority.source),
        format!("action-log = {} ({})", c.action_log.value, c.action_log.source),
    ];
    if let Some(level) = &c.log_level {
        lines.push(format!("log-level = {} ({})", level.value, level.source));
    }
    lines.push(format!("data config: {}", r.data_path));
    if let Some(path) = &r.system_path {
        lines.push(format!("system config: {}", path));
    }
    lines.join("\n")
});

pub fn config_show(session: &Session) -> ConfigShow {
    ConfigShow {
        config: session.config.clone(),
        system_path: system_config_path().map(|p| p.display().to_string()),
        data_path: data_config_path(&session.data_dir).display().to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: String,
}

json_output!(ConfigSetResult => |r| format!("Set {} = {} in {}", r.key, r.value, r.path));

pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigSetResult> {
    let path = data_config_path(data_dir);
    let mut config: CrewtaskConfig = read_config(&path)?;
    config.set(key, value).map_err(Error::Config)?;
    write_config(&path, &config)?;
    Ok(ConfigSetResult {
        key: key.to_string(),
        value: value.to_string(),
        path: path.display().to_string(),
    })
}

// === Users ===

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

json_output!(UserList => |r| {
    if r.users.is_empty() {
        return "No users.".to_string();
    }
    r.users
        .iter()
        .map(|u| format!("{} {}", u.id, u.name))
        .collect::<Vec<_>>()
        .join("\n")
});

json_output!(User => |u| format!("Saved user {} ({})", u.id, u.name));

pub fn user_add(
    session: &Session,
    id: &str,
    name: &str,
    avatar: Option<String>,
    email: Option<String>,
) -> Result<User> {
    let mut user = User::new(id.trim(), name.trim());
    user.avatar = avatar;
    user.email = email;
    session.engine()?.add_user(user)
}

pub fn user_list(session: &Session) -> Result<UserList> {
    Ok(UserList {
        users: session.engine()?.users()?,
    })
}

// === Groups ===

json_output!(Group => |g| format!(
    "{} {} [{}] members: {} | invite code {}",
    g.id,
    g.name,
    g.kind,
    g.members.join(", "),
    g.invite_code
));

#[derive(Debug, Serialize)]
pub struct GroupList {
    pub groups: Vec<Group>,
}

json_output!(GroupList => |r| {
    if r.groups.is_empty() {
        return "No groups.".to_string();
    }
    r.groups.iter().map(|g| g.to_human()).collect::<Vec<_>>().join("\n")
});

json_output!(GroupLeft => |r| format!(
    "Left {}. Notified {}.",
    r.group.name,
    r.notification.user_id.as_deref().unwrap_or("the group")
));

json_output!(GroupDeleted => |r| format!(
    "Deleted group {} ({} tasks, {} suggestions)",
    r.group_id, r.tasks_removed, r.suggestions_removed
));

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub group_id: String,
    pub entries: Vec<LeaderboardEntry>,
}

json_output!(Leaderboard => |r| {
    r.entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {} {} pts", i + 1, e.name, e.points))
        .collect::<Vec<_>>()
        .join("\n")
});

pub fn group_create(session: &Session, name: &str, kind: &str) -> Result<Group> {
    let kind = parse_context(kind)?;
    session.engine()?.create_group(name, kind, session.viewer())
}

/// Groups the viewer belongs to.
pub fn group_list(session: &Session) -> Result<GroupList> {
    let viewer = session.viewer();
    Ok(GroupList {
        groups: session
            .engine()?
            .groups()?
            .into_iter()
            .filter(|g| g.is_member(viewer))
            .collect(),
    })
}

pub fn group_join(session: &Session, code: &str) -> Result<Group> {
    session.engine()?.join_group(code, session.viewer())
}

pub fn group_leave(session: &Session, id: &str) -> Result<GroupLeft> {
    session.engine()?.leave_group(id, session.viewer())
}

pub fn group_delete(session: &Session, id: &str) -> Result<GroupDeleted> {
    session.engine()?.delete_group(id, session.viewer())
}

pub fn group_leaderboard(session: &Session, id: &str) -> Result<Leaderboard> {
    Ok(Leaderboard {
        group_id: id.to_string(),
        entries: session.engine()?.leaderboard(id)?,
    })
}

// === Tasks ===

json_output!(Task => |t| {
    let mut lines = vec![task_line(t)];
    if let Some(reason) = &t.block_reason {
        lines.push(format!(
            "  blocked by {}: {}",
            t.blocked_by.as_deref().unwrap_or("?"),
            reason
        ));
    }
    if t.unread_comments > 0 {
        lines.push(format!("  {} unread comments", t.unread_comments));
    }
    lines.join("\n")
});

/// Options for `ct task create`.
#[derive(Debug, Clone, Default)]
pub struct CreateTaskArgs {
    pub title: String,
    pub group: String,
    pub assignees: Vec<String>,
    pub category: String,
    pub due: Option<String>,
    pub time: Option<String>,
    pub priority: Option<String>,
}

pub fn task_create(session: &Session, args: CreateTaskArgs) -> Result<Task> {
    let priority = match args.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => session.config.default_priority(),
    };
    let draft = TaskDraft {
        group_id: args.group,
        title: args.title,
        assignees: args.assignees,
        category: args.category,
        due: args.due.as_deref().map(Due::parse),
        time: args.time,
        priority: Some(priority),
    };
    session.engine()?.create_task(draft, session.viewer())
}

#[derive(Debug, Serialize)]
pub struct TaskRow {
    #[serde(flatten)]
    pub task: Task,
    pub urgency: i32,
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskRow>,
    pub count: usize,
}

json_output!(TaskList => |r| {
    if r.tasks.is_empty() {
        return "No tasks.".to_string();
    }
    r.tasks
        .iter()
        .map(|row| format!("{:>3} {}", row.urgency, task_line(&row.task)))
        .collect::<Vec<_>>()
        .join("\n")
});

/// Tasks in scope, most urgent first.
pub fn task_list(session: &Session, group: &str, status: Option<&str>) -> Result<TaskList> {
    let status = status.map(parse_status).transpose()?;
    let engine = session.engine()?;
    let today = engine.today();
    let tasks: Vec<Task> = engine
        .tasks(&session.scope(group))?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();
    let rows: Vec<TaskRow> = rank_by_urgency(&tasks, today)
        .into_iter()
        .map(|ranked| TaskRow {
            task: ranked.task.clone(),
            urgency: ranked.score,
        })
        .collect();
    Ok(TaskList {
        count: rows.len(),
        tasks: rows,
    })
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub urgency: i32,
    pub overdue: bool,
    /// Points completing the task today would award
    pub reward: PointsBreakdown,
}

json_output!(TaskDetail => |r| {
    let mut lines = vec![r.task.to_human()];
    lines.push(format!(
        "  urgency {}{}",
        r.urgency,
        if r.overdue { " (overdue)" } else { "" }
    ));
    let b = &r.reward;
    lines.push(format!(
        "  reward today: {} pts (base {}, timeliness {}, category {}, postponements {}, collaboration {})",
        b.total, b.base, b.timeliness, b.category, b.postponements, b.collaboration
    ));
    for c in &r.task.comments {
        lines.push(format!("  {} {}: {}", c.timestamp, c.user, c.text));
    }
    lines.join("\n")
});

pub fn task_show(session: &Session, id: &str) -> Result<TaskDetail> {
    let engine = session.engine()?;
    let today = engine.today();
    let task = engine.task(id)?;
    Ok(TaskDetail {
        urgency: urgency_score(&task, today),
        overdue: task.is_overdue(today),
        reward: points_breakdown(&task, today),
        task,
    })
}

json_output!(ActionResult => |r| {
    let mut lines = vec![match &r.outcome {
        ActionOutcome::Completed { points } => format!("Completed {} (+{} pts)", r.task.id, points),
        ActionOutcome::ValidationRequested => format!("Validation requested for {}", r.task.id),
        ActionOutcome::Postponed { count } => {
            format!("Postponed {} to tomorrow ({} times)", r.task.id, count)
        }
        ActionOutcome::Blocked => format!("Blocked {}", r.task.id),
        ActionOutcome::Unblocked => format!("Unblocked {}", r.task.id),
        ActionOutcome::Restored => format!("Restored {}", r.task.id),
        ActionOutcome::RestoreRequired => format!(
            "{} is completed; run `ct task restore {} -a <user>` to reopen it",
            r.task.id, r.task.id
        ),
        ActionOutcome::Unavailable { reason } => format!("Action unavailable: {}", reason),
    }];
    lines.extend(r.suggestions.iter().map(|s| format!("  -> {}", suggestion_line(s))));
    lines.join("\n")
});

pub fn task_act(session: &Session, id: &str) -> Result<ActionResult> {
    session.engine()?.main_action(id, session.viewer())
}

pub fn task_postpone(session: &Session, id: &str, reason: Option<&str>) -> Result<ActionResult> {
    session.engine()?.postpone(id, session.viewer(), reason)
}

pub fn task_block(session: &Session, id: &str, reason: &str) -> Result<ActionResult> {
    session.engine()?.block(id, session.viewer(), reason)
}

pub fn task_unblock(session: &Session, id: &str) -> Result<ActionResult> {
    session.engine()?.unblock(id, session.viewer())
}

pub fn task_restore(
    session: &Session,
    id: &str,
    assignees: Vec<String>,
    due: &str,
    time: Option<String>,
) -> Result<ActionResult> {
    let request = RestoreRequest {
        assignees,
        due: Due::parse(due),
        time,
    };
    session.engine()?.confirm_restore(id, session.viewer(), request)
}

json_output!(CommentAdded => |r| {
    let mut lines = vec![format!("Commented on {} as {}", r.task.id, r.comment.user)];
    lines.extend(r.mentions.iter().map(|s| {
        format!("  -> mentioned {}", s.user_id.as_deref().unwrap_or("?"))
    }));
    lines.join("\n")
});

pub fn task_comment(session: &Session, id: &str, text: &str) -> Result<CommentAdded> {
    session.engine()?.add_comment(id, session.viewer(), text)
}

pub fn task_read(session: &Session, id: &str) -> Result<Task> {
    session.engine()?.mark_comments_read(id)
}

// === Summaries, reports and feed ===

json_output!(Summary => |s| s.text.clone());

json_output!(WeeklyReport => |r| r.text.clone());

pub fn summary(session: &Session, group: &str) -> Result<Summary> {
    session.engine()?.summary(&session.scope(group))
}

pub fn weekly(session: &Session, group: &str, greeting: Option<usize>) -> Result<WeeklyReport> {
    let mut source: Box<dyn GreetingSource> = match greeting {
        Some(index) => Box::new(FixedGreeting(index)),
        None => Box::new(RandomGreeting),
    };
    session
        .engine()?
        .weekly_report(&session.scope(group), source.as_mut())
}

#[derive(Debug, Serialize)]
pub struct Feed {
    pub viewer: String,
    pub suggestions: Vec<Suggestion>,
}

json_output!(Feed => |r| {
    if r.suggestions.is_empty() {
        return format!("Nothing new for {}.", r.viewer);
    }
    r.suggestions.iter().map(suggestion_line).collect::<Vec<_>>().join("\n")
});

pub fn feed(session: &Session, group: &str) -> Result<Feed> {
    let viewer = session.viewer();
    Ok(Feed {
        viewer: viewer.to_string(),
        suggestions: session.engine()?.feed(viewer, &session.scope(group))?,
    })
}

json_output!(Suggestion => |s| format!("Dismissed {}", suggestion_line(s)));

pub fn suggestion_dismiss(session: &Session, id: &str) -> Result<Suggestion> {
    session.engine()?.dismiss_suggestion(id, session.viewer())
}

#[derive(Debug, Serialize)]
pub struct DetectedDate {
    pub text: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
}

json_output!(DetectedDate => |r| {
    let date = r
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "no date".to_string());
    match &r.time {
        Some(time) => format!("{} {}", date, time),
        None => date,
    }
});

/// Detect a due date and time without touching storage.
pub fn detect_date(session: &Session, text: &str) -> DetectedDate {
    let today = session.today.unwrap_or_else(|| SystemClock.today());
    DetectedDate {
        text: text.to_string(),
        date: detect_date_from_text(text, today),
        time: detect_time_from_text(text),
    }
}

#[derive(Debug, Serialize)]
pub struct PushApplied {
    pub event: String,
}

json_output!(PushApplied => |r| format!("Applied {} event", r.event));

pub fn push(session: &Session, event: &str) -> Result<PushApplied> {
    let event = PushEvent::from_json(event)?;
    let name = match &event {
        PushEvent::TaskCreated { .. } => "task-created",
        PushEvent::TaskUpdated { .. } => "task-updated",
        PushEvent::TaskDeleted { .. } => "task-deleted",
        PushEvent::Notification { .. } => "notification",
    };
    session.engine()?.apply_push(event, session.viewer())?;
    Ok(PushApplied {
        event: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::test_utils::wednesday;
    use tempfile::TempDir;

    fn session(dir: &TempDir, viewer: &str) -> Session {
        let mut config = ResolvedConfig::default();
        config.viewer.value = viewer.to_string();
        Session::new(dir.path().to_path_buf(), config, Some(wednesday()))
    }

    #[test]
    fn test_commands_require_init() {
        let dir = TempDir::new().unwrap();
        let err = group_list(&session(&dir, "ana")).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        assert!(system_init(dir.path()).unwrap().initialized);
        assert!(!system_init(dir.path()).unwrap().initialized);
    }

    #[test]
    fn test_task_list_ranks_and_filters() {
        let dir = TempDir::new().unwrap();
        system_init(dir.path()).unwrap();
        let ana = session(&dir, "ana");
        let group = group_create(&ana, "Planta", "work").unwrap();

        let low = task_create(
            &ana,
            CreateTaskArgs {
                title: "Ordenar bodega".into(),
                group: group.id.clone(),
                priority: Some("low".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let urgent = task_create(
            &ana,
            CreateTaskArgs {
                title: "Reparar caldera".into(),
                group: group.id.clone(),
                category: "Crítico".into(),
                priority: Some("alta".into()),
                due: Some("yesterday".into()),
                ..Default::default()
            },
        )
        .unwrap();
        task_block(&ana, &low.id, "sin llave").unwrap();

        let list = task_list(&ana, "all", None).unwrap();
        assert_eq!(list.count, 2);
        assert_eq!(list.tasks[0].task.id, urgent.id);

        let blocked = task_list(&ana, "all", Some("blocked")).unwrap();
        assert_eq!(blocked.count, 1);
        assert!(task_list(&ana, "all", Some("nope")).is_err());
    }

    #[test]
    fn test_config_set_writes_data_dir_config() {
        let dir = TempDir::new().unwrap();
        config_set(dir.path(), "viewer", "beto").unwrap();
        let config = read_config(&data_config_path(dir.path())).unwrap();
        assert_eq!(config.viewer.as_deref(), Some("beto"));
        assert!(config_set(dir.path(), "nope", "x").is_err());
    }

    #[test]
    fn test_detect_date_uses_pinned_today() {
        let dir = TempDir::new().unwrap();
        let result = detect_date(&session(&dir, "ana"), "entregar para el viernes 9:05");
        assert_eq!(result.date, NaiveDate::from_ymd_opt(2025, 2, 7));
        assert_eq!(result.time.as_deref(), Some("09:05"));
        assert_eq!(result.to_human(), "2025-02-07 09:05");
    }

    #[test]
    fn test_action_result_human_text() {
        let dir = TempDir::new().unwrap();
        system_init(dir.path()).unwrap();
        let ana = session(&dir, "ana");
        let group = group_create(&ana, "Planta", "work").unwrap();
        let task = task_create(
            &ana,
            CreateTaskArgs {
                title: "Revisar".into(),
                group: group.id,
                ..Default::default()
            },
        )
        .unwrap();
        let done = task_act(&ana, &task.id).unwrap();
        assert_eq!(done.to_human(), format!("Completed {} (+40 pts)", task.id));
        let again = task_act(&ana, &task.id).unwrap();
        assert!(again.to_human().contains("ct task restore"));
    }
}
