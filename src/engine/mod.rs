//! The task engine.
//!
//! [`Engine`] owns a [`Repository`], a [`Remote`] and a [`Clock`] and runs
//! every mutation through the same protocol: change a copy, store it
//! locally, write it remotely, and put the previous version back if the
//! remote write fails. Pure computations live in the submodules and can be
//! used without an engine.

pub mod lifecycle;
pub mod routing;
pub mod summary;
pub mod sync;
pub mod weekly;

pub use lifecycle::{ActionOutcome, LedgerDelta, RestoreRequest, Transition};
pub use routing::{filter_visible_suggestions, is_visible};
pub use summary::{Summary, generate_intelligent_summary};
pub use sync::{OfflineRemote, PushEvent, Remote, TaskPatch, merge_remote_task};
pub use weekly::{FixedGreeting, GreetingSource, RandomGreeting, WeeklyReport, generate_weekly_report};

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::models::date_text::{detect_date_from_text, detect_time_from_text, fold};
use crate::models::{
    Comment, Context, Due, Group, Priority, Scope, Suggestion, SuggestionKind, Task, TaskStatus,
    User,
};
use crate::storage::{Repository, generate_id, generate_invite_code};
use crate::{Error, Result};

/// Source of "today" and "now".
pub trait Clock {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

/// The local calendar date and the current instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that never moves.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    /// Pinned to noon UTC on `today`.
    pub fn on(today: NaiveDate) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        Self {
            today,
            now: Utc.from_utc_datetime(&today.and_time(noon)),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// A fixed calendar date with the real current instant.
#[derive(Debug, Clone, Copy)]
pub struct PinnedDate(pub NaiveDate);

impl Clock for PinnedDate {
    fn today(&self) -> NaiveDate {
        self.0
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// "@handle" in comment text.
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w.-]+)").expect("mention pattern is valid"));

/// Input for [`Engine::create_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub group_id: String,
    pub title: String,
    /// Empty means the creator
    pub assignees: Vec<String>,
    pub category: String,
    /// `None` means detect from the title, else today
    pub due: Option<Due>,
    /// `None` means extract from the title
    pub time: Option<String>,
    pub priority: Option<Priority>,
}

/// Result of a lifecycle action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// The task after the action (unchanged when the action did not apply)
    pub task: Task,
    pub outcome: ActionOutcome,
    /// Suggestions emitted as side effects
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentAdded {
    pub task: Task,
    pub comment: Comment,
    pub mentions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupLeft {
    pub group: Group,
    pub notification: Suggestion,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDeleted {
    pub group_id: String,
    pub tasks_removed: usize,
    pub suggestions_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub points: i64,
}

fn sync_error(err: Error) -> Error {
    match err {
        Error::RemoteSync(_) => err,
        other => Error::RemoteSync(other.to_string()),
    }
}

/// Task engine over a repository and a remote service.
pub struct Engine<S: Repository, R: Remote> {
    store: S,
    remote: R,
    clock: Box<dyn Clock>,
    in_flight: HashSet<String>,
}

impl<S: Repository, R: Remote> Engine<S, R> {
    pub fn new(store: S, remote: R, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            remote,
            clock,
            in_flight: HashSet::new(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    // === Tasks ===

    pub fn task(&self, id: &str) -> Result<Task> {
        self.store.require(id)
    }

    /// Tasks owned by groups in `scope`.
    pub fn tasks(&self, scope: &Scope) -> Result<Vec<Task>> {
        let groups: Vec<Group> = self.store.list()?;
        Ok(self
            .store
            .list::<Task>()?
            .into_iter()
            .filter(|t| scope.includes(&t.group_id, &groups))
            .collect())
    }

    /// Create a task in a group the creator belongs to.
    pub fn create_task(&mut self, draft: TaskDraft, creator: &str) -> Result<Task> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("a task needs a title".to_string()));
        }
        let group: Group = self.store.require(&draft.group_id)?;
        if !group.is_member(creator) {
            return Err(Error::Permission(format!(
                "{} is not a member of {}",
                creator, group.id
            )));
        }

        let today = self.clock.today();
        let now = self.clock.now();
        let due = draft.due.unwrap_or_else(|| {
            detect_date_from_text(&title, today)
                .map(Due::Date)
                .unwrap_or(Due::Today)
        });
        let time = draft.time.or_else(|| detect_time_from_text(&title));
        let mut assignees = lifecycle::dedup(draft.assignees);
        if assignees.is_empty() {
            assignees.push(creator.to_string());
        }
        check_members(&group, &assignees)?;

        let id = generate_id("ct", &format!("{}:{}", group.id, title));
        let mut task = Task::new(id, group.id.clone(), title, creator.to_string());
        task.assignees = assignees;
        task.category = draft.category.trim().to_string();
        task.status = TaskStatus::initial(&due, today);
        task.due = due;
        task.time = time;
        task.priority = draft.priority.unwrap_or_default();
        task.created_at = now;
        task.updated_at = now;

        self.store.upsert(&task)?;
        match self.remote.create_task(&task) {
            Ok(canonical) => {
                if canonical.id != task.id {
                    self.store.delete::<Task>(&task.id)?;
                }
                self.store.upsert(&canonical)?;
                info!(task = %canonical.id, group = %canonical.group_id, status = %canonical.status, "task created");
                Ok(canonical)
            }
            Err(e) => {
                warn!(task = %task.id, error = %e, "remote create failed; discarding local task");
                self.store.delete::<Task>(&task.id)?;
                Err(sync_error(e))
            }
        }
    }

    /// Complete, request validation, or ask for a restore, depending on
    /// the task's state.
    pub fn main_action(&mut self, task_id: &str, actor: &str) -> Result<ActionResult> {
        let before: Task = self.store.require(task_id)?;
        let group: Group = self.store.require(&before.group_id)?;
        if !group.is_member(actor) {
            return Err(Error::Permission(format!(
                "{} is not a member of {}",
                actor, group.id
            )));
        }
        let mut task = before.clone();
        let transition =
            lifecycle::main_action(&mut task, actor, self.clock.today(), self.clock.now())?;
        self.apply(before, task, transition, actor)
    }

    pub fn postpone(&mut self, task_id: &str, actor: &str, reason: Option<&str>) -> Result<ActionResult> {
        let before: Task = self.store.require(task_id)?;
        let mut task = before.clone();
        let transition = lifecycle::postpone(&mut task, reason, self.clock.now())?;
        self.apply(before, task, transition, actor)
    }

    pub fn block(&mut self, task_id: &str, actor: &str, reason: &str) -> Result<ActionResult> {
        let before: Task = self.store.require(task_id)?;
        let mut task = before.clone();
        let transition = lifecycle::block(&mut task, actor, reason, self.clock.now())?;
        self.apply(before, task, transition, actor)
    }

    pub fn unblock(&mut self, task_id: &str, actor: &str) -> Result<ActionResult> {
        let before: Task = self.store.require(task_id)?;
        let mut task = before.clone();
        let transition = lifecycle::unblock(&mut task, self.clock.now());
        self.apply(before, task, transition, actor)
    }

    /// Reopen a completed task with new assignees and due date.
    pub fn confirm_restore(
        &mut self,
        task_id: &str,
        actor: &str,
        request: RestoreRequest,
    ) -> Result<ActionResult> {
        let before: Task = self.store.require(task_id)?;
        let group: Group = self.store.require(&before.group_id)?;
        check_members(&group, &lifecycle::dedup(request.assignees.clone()))?;
        let mut task = before.clone();
        let transition = lifecycle::restore(&mut task, request, self.clock.now())?;
        self.apply(before, task, transition, actor)
    }

    fn apply(
        &mut self,
        before: Task,
        task: Task,
        transition: Transition,
        actor: &str,
    ) -> Result<ActionResult> {
        if !transition.outcome.is_applied() {
            debug!(task = %before.id, actor, outcome = ?transition.outcome, "action not applied");
            return Ok(ActionResult {
                task: before,
                outcome: transition.outcome,
                suggestions: Vec::new(),
            });
        }

        self.commit_task(&before, &task)?;
        if let Some(ledger) = &transition.ledger {
            if let Err(e) = self.apply_ledger(&task.group_id, ledger) {
                self.revert_task(&task, &before)?;
                return Err(e);
            }
        }
        info!(task = %task.id, actor, outcome = ?transition.outcome, status = %task.status, "task updated");

        let mut suggestions = Vec::new();
        match &transition.outcome {
            ActionOutcome::ValidationRequested => {
                let kind = SuggestionKind::ValidationRequest {
                    task_id: task.id.clone(),
                    requested_by: actor.to_string(),
                };
                let suggestion = self.suggestion(
                    &task.group_id,
                    kind,
                    format!("Validar: {}", task.title),
                    format!("{} marcó la tarea como lista y pide validación.", actor),
                    "Revisar y validar la tarea",
                );
                suggestions.push(self.emit(suggestion)?);
            }
            ActionOutcome::Completed { .. } => self.clear_validation_requests(&task.id)?,
            _ => {}
        }
        if transition.postpone_alert {
            if let Some(alert) = self.postpone_alert(&task)? {
                suggestions.push(alert);
            }
        }

        Ok(ActionResult {
            task,
            outcome: transition.outcome,
            suggestions,
        })
    }

    /// Mark a task as having a local edit on its way to the remote. Push
    /// events for it keep the local lifecycle fields until released.
    pub fn hold_edit(&mut self, task_id: &str) {
        self.in_flight.insert(task_id.to_string());
    }

    pub fn release_edit(&mut self, task_id: &str) {
        self.in_flight.remove(task_id);
    }

    fn commit_task(&mut self, before: &Task, after: &Task) -> Result<()> {
        let patch = TaskPatch::diff(before, after);
        if patch.is_empty() {
            return Ok(());
        }
        self.store.upsert(after)?;
        self.hold_edit(&after.id);
        let sent = self.remote.update_task(&after.id, &patch);
        self.release_edit(&after.id);
        if let Err(e) = sent {
            warn!(task = %after.id, error = %e, "remote update failed; reverting");
            self.store.upsert(before)?;
            return Err(sync_error(e));
        }
        Ok(())
    }

    /// Put `before` back after `current` reached both stores.
    fn revert_task(&mut self, current: &Task, before: &Task) -> Result<()> {
        self.store.upsert(before)?;
        let patch = TaskPatch::diff(current, before);
        if let Err(e) = self.remote.update_task(&before.id, &patch) {
            warn!(task = %before.id, error = %e, "remote revert failed");
        }
        Ok(())
    }

    fn apply_ledger(&mut self, group_id: &str, ledger: &LedgerDelta) -> Result<()> {
        let before: Group = self.store.require(group_id)?;
        let mut group = before.clone();
        group.apply_points(&ledger.user_id, ledger.delta);
        self.store.upsert(&group)?;
        if let Err(e) = self
            .remote
            .apply_score_delta(group_id, &ledger.user_id, ledger.delta)
        {
            warn!(group = group_id, user = %ledger.user_id, delta = ledger.delta, error = %e, "remote score update failed; reverting");
            self.store.upsert(&before)?;
            return Err(sync_error(e));
        }
        info!(group = group_id, user = %ledger.user_id, delta = ledger.delta, total = group.points(&ledger.user_id), "ledger updated");
        Ok(())
    }

    /// Emit the coordination alert for a task postponed twice, once.
    fn postpone_alert(&mut self, task: &Task) -> Result<Option<Suggestion>> {
        let exists = self
            .store
            .list::<Suggestion>()?
            .iter()
            .any(|s| s.is_system_alert_for(&task.id));
        if exists {
            return Ok(None);
        }
        let reason = task
            .postpone_reason
            .as_deref()
            .map(|r| format!(" Último motivo: {}.", r))
            .unwrap_or_default();
        let suggestion = self.suggestion(
            &task.group_id,
            SuggestionKind::SystemAlert {
                task_id: task.id.clone(),
            },
            format!("«{}» se ha pospuesto {} veces", task.title, task.postpone_count),
            format!("La tarea sigue sin avanzar.{}", reason),
            "Agendar una reunión de coordinación",
        );
        self.emit(suggestion).map(Some)
    }

    fn clear_validation_requests(&mut self, task_id: &str) -> Result<()> {
        let stale: Vec<String> = self
            .store
            .list::<Suggestion>()?
            .into_iter()
            .filter(|s| {
                matches!(&s.kind, SuggestionKind::ValidationRequest { task_id: t, .. } if t == task_id)
            })
            .map(|s| s.id)
            .collect();
        for id in stale {
            self.store.delete::<Suggestion>(&id)?;
            debug!(suggestion = %id, task = task_id, "validation request cleared");
        }
        Ok(())
    }

    fn suggestion(
        &self,
        group_id: &str,
        kind: SuggestionKind,
        subject: String,
        context: String,
        action: &str,
    ) -> Suggestion {
        let id = generate_id("cts", &format!("{}:{}:{}", group_id, kind.as_str(), subject));
        let mut suggestion =
            Suggestion::new(id, group_id.to_string(), kind, subject, context, action);
        suggestion.created_at = self.clock.now();
        suggestion
    }

    /// Store and publish a suggestion. Delivery failures are logged; the
    /// local copy is kept.
    fn emit(&mut self, suggestion: Suggestion) -> Result<Suggestion> {
        self.store.upsert(&suggestion)?;
        if let Err(e) = self.remote.publish(&suggestion) {
            warn!(suggestion = %suggestion.id, error = %e, "publishing suggestion failed");
        }
        info!(suggestion = %suggestion.id, kind = suggestion.kind.as_str(), group = %suggestion.group_id, user = ?suggestion.user_id, "suggestion emitted");
        Ok(suggestion)
    }

    // === Comments ===

    /// Append a comment and notify every mentioned member.
    pub fn add_comment(&mut self, task_id: &str, author: &str, text: &str) -> Result<CommentAdded> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("a comment needs text".to_string()));
        }
        let before: Task = self.store.require(task_id)?;
        let group: Group = self.store.require(&before.group_id)?;
        if !group.is_member(author) {
            return Err(Error::Permission(format!(
                "{} is not a member of {}",
                author, group.id
            )));
        }

        let profile: Option<User> = self.store.get(author)?;
        let now = self.clock.now();
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            user: profile
                .as_ref()
                .map_or_else(|| author.to_string(), |u| u.name.clone()),
            avatar: profile.and_then(|u| u.avatar),
            user_id: author.to_string(),
            text: text.to_string(),
            timestamp: now.with_timezone(&Local).format("%d/%m %H:%M").to_string(),
        };

        let mut task = before.clone();
        task.comments.push(comment.clone());
        if task.assignees.iter().any(|a| a != author) {
            task.unread_comments += 1;
        }
        task.updated_at = now;
        self.commit_task(&before, &task)?;
        debug!(task = %task.id, author, "comment added");

        let users: Vec<User> = self.store.list()?;
        let mut mentions = Vec::new();
        for member in mentioned_members(text, &group, &users) {
            if member == author {
                continue;
            }
            let kind = SuggestionKind::Mention {
                task_id: task.id.clone(),
                mentioned_by: author.to_string(),
            };
            let suggestion = self
                .suggestion(
                    &task.group_id,
                    kind,
                    format!("{} te mencionó en «{}»", comment.user, task.title),
                    text.to_string(),
                    "Responder en la tarea",
                )
                .for_user(member);
            mentions.push(self.emit(suggestion)?);
        }

        Ok(CommentAdded {
            task,
            comment,
            mentions,
        })
    }

    /// Reset the unread comment counter.
    pub fn mark_comments_read(&mut self, task_id: &str) -> Result<Task> {
        let before: Task = self.store.require(task_id)?;
        let mut task = before.clone();
        task.unread_comments = 0;
        self.commit_task(&before, &task)?;
        Ok(task)
    }

    // === Groups ===

    pub fn groups(&self) -> Result<Vec<Group>> {
        self.store.list()
    }

    pub fn create_group(&mut self, name: &str, kind: Context, creator: &str) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("a group needs a name".to_string()));
        }
        let seed = format!("{}:{}", creator, name);
        let mut group = Group::new(
            generate_id("ctg", &seed),
            name.to_string(),
            kind,
            creator.to_string(),
            generate_invite_code(&seed),
        );
        group.created_at = self.clock.now();

        self.store.upsert(&group)?;
        match self.remote.create_group(&group) {
            Ok(canonical) => {
                if canonical.id != group.id {
                    self.store.delete::<Group>(&group.id)?;
                }
                self.store.upsert(&canonical)?;
                info!(group = %canonical.id, kind = %canonical.kind, creator, "group created");
                Ok(canonical)
            }
            Err(e) => {
                warn!(group = %group.id, error = %e, "remote create failed; discarding local group");
                self.store.delete::<Group>(&group.id)?;
                Err(sync_error(e))
            }
        }
    }

    /// Join the group with invite `code`. Joining twice is a no-op.
    pub fn join_group(&mut self, code: &str, user_id: &str) -> Result<Group> {
        let code = code.trim().to_uppercase();
        if let Some(group) = self.remote.join_group(&code, user_id).map_err(sync_error)? {
            self.store.upsert(&group)?;
            info!(group = %group.id, user = user_id, "joined group");
            return Ok(group);
        }

        let mut group = self
            .store
            .list::<Group>()?
            .into_iter()
            .find(|g| g.invite_code == code)
            .ok_or_else(|| Error::NotFound(format!("no group with invite code {}", code)))?;
        if group.add_member(user_id) {
            self.store.upsert(&group)?;
            info!(group = %group.id, user = user_id, "joined group");
        }
        Ok(group)
    }

    /// Leave a group. The creator is told through a targeted suggestion.
    pub fn leave_group(&mut self, group_id: &str, user_id: &str) -> Result<GroupLeft> {
        let before: Group = self.store.require(group_id)?;
        if before.creator_id == user_id {
            return Err(Error::Validation(
                "the creator cannot leave a group; delete it instead".to_string(),
            ));
        }
        let mut group = before.clone();
        if !group.remove_member(user_id) {
            return Err(Error::Validation(format!(
                "{} is not a member of {}",
                user_id, group_id
            )));
        }

        self.store.upsert(&group)?;
        if let Err(e) = self.remote.leave_group(group_id, user_id) {
            warn!(group = group_id, user = user_id, error = %e, "remote leave failed; reverting");
            self.store.upsert(&before)?;
            return Err(sync_error(e));
        }
        info!(group = group_id, user = user_id, "left group");

        let name = self
            .store
            .get::<User>(user_id)?
            .map_or_else(|| user_id.to_string(), |u| u.name);
        let suggestion = self
            .suggestion(
                group_id,
                SuggestionKind::MemberLeft {
                    member_id: user_id.to_string(),
                },
                format!("{} salió de {}", name, group.name),
                "Sus tareas pueden necesitar un nuevo responsable.".to_string(),
                "Reasignar sus tareas",
            )
            .for_user(group.creator_id.clone());
        let notification = self.emit(suggestion)?;
        Ok(GroupLeft {
            group,
            notification,
        })
    }

    /// Delete a group with its tasks and suggestions. Creator only.
    pub fn delete_group(&mut self, group_id: &str, actor: &str) -> Result<GroupDeleted> {
        let group: Group = self.store.require(group_id)?;
        if group.creator_id != actor {
            return Err(Error::Permission(format!(
                "only the creator can delete {}",
                group_id
            )));
        }
        let tasks: Vec<Task> = self
            .store
            .list::<Task>()?
            .into_iter()
            .filter(|t| t.group_id == group_id)
            .collect();
        let suggestions: Vec<Suggestion> = self
            .store
            .list::<Suggestion>()?
            .into_iter()
            .filter(|s| s.group_id == group_id)
            .collect();

        for task in &tasks {
            self.store.delete::<Task>(&task.id)?;
        }
        for suggestion in &suggestions {
            self.store.delete::<Suggestion>(&suggestion.id)?;
        }
        self.store.delete::<Group>(group_id)?;

        if let Err(e) = self.remote.delete_group(group_id) {
            warn!(group = group_id, error = %e, "remote delete failed; restoring");
            self.store.upsert(&group)?;
            for task in &tasks {
                self.store.upsert(task)?;
            }
            for suggestion in &suggestions {
                self.store.upsert(suggestion)?;
            }
            return Err(sync_error(e));
        }
        info!(group = group_id, tasks = tasks.len(), suggestions = suggestions.len(), "group deleted");
        Ok(GroupDeleted {
            group_id: group_id.to_string(),
            tasks_removed: tasks.len(),
            suggestions_removed: suggestions.len(),
        })
    }

    /// Members by points, highest first.
    pub fn leaderboard(&self, group_id: &str) -> Result<Vec<LeaderboardEntry>> {
        let group: Group = self.store.require(group_id)?;
        let users: Vec<User> = self.store.list()?;
        Ok(group
            .leaderboard()
            .into_iter()
            .map(|(user_id, points)| LeaderboardEntry {
                name: display_name(&users, &user_id),
                user_id,
                points,
            })
            .collect())
    }

    // === Users ===

    pub fn users(&self) -> Result<Vec<User>> {
        self.store.list()
    }

    pub fn add_user(&mut self, user: User) -> Result<User> {
        if user.id.trim().is_empty() {
            return Err(Error::Validation("a user needs an id".to_string()));
        }
        self.store.upsert(&user)?;
        Ok(user)
    }

    // === Feed and reports ===

    /// The viewer's notification feed.
    pub fn feed(&self, viewer_id: &str, scope: &Scope) -> Result<Vec<Suggestion>> {
        let groups: Vec<Group> = self.store.list()?;
        let all: Vec<Suggestion> = self.store.list()?;
        Ok(filter_visible_suggestions(&all, viewer_id, scope, &groups)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Remove a processed suggestion.
    pub fn dismiss_suggestion(&mut self, id: &str, viewer_id: &str) -> Result<Suggestion> {
        let suggestion: Suggestion = self.store.require(id)?;
        if suggestion
            .user_id
            .as_deref()
            .is_some_and(|target| target != viewer_id)
        {
            return Err(Error::Permission(format!(
                "{} is addressed to someone else",
                id
            )));
        }
        self.store.delete::<Suggestion>(id)?;
        debug!(suggestion = id, viewer = viewer_id, "suggestion dismissed");
        Ok(suggestion)
    }

    pub fn summary(&self, scope: &Scope) -> Result<Summary> {
        let tasks = self.tasks(scope)?;
        Ok(generate_intelligent_summary(&tasks, self.clock.today()))
    }

    /// Weekly report over the tasks and members of the groups in `scope`.
    pub fn weekly_report(
        &self,
        scope: &Scope,
        greeting: &mut dyn GreetingSource,
    ) -> Result<WeeklyReport> {
        let groups: Vec<Group> = self.store.list()?;
        let users: Vec<User> = self.store.list()?;
        let mut member_ids: Vec<String> = Vec::new();
        for group in groups.iter().filter(|g| scope.includes(&g.id, &groups)) {
            for member in &group.members {
                if !member_ids.contains(member) {
                    member_ids.push(member.clone());
                }
            }
        }
        let members: Vec<User> = member_ids
            .into_iter()
            .map(|id| {
                users
                    .iter()
                    .find(|u| u.id == id)
                    .cloned()
                    .unwrap_or_else(|| User::new(id.clone(), id))
            })
            .collect();
        let tasks = self.tasks(scope)?;
        Ok(generate_weekly_report(
            &tasks,
            &members,
            self.clock.today(),
            greeting,
        ))
    }

    // === Push events ===

    /// Merge an event pushed by the remote service.
    pub fn apply_push(&mut self, event: PushEvent, viewer_id: &str) -> Result<()> {
        match event {
            PushEvent::TaskCreated { task } | PushEvent::TaskUpdated { task } => {
                let local: Option<Task> = self.store.get(&task.id)?;
                let in_flight = self.in_flight.contains(&task.id);
                let merged = merge_remote_task(local.as_ref(), *task, viewer_id, in_flight);
                self.store.upsert(&merged)?;
                debug!(task = %merged.id, in_flight, unread = merged.unread_comments, "remote task merged");
            }
            PushEvent::TaskDeleted { task_id } => {
                let removed = self.store.delete::<Task>(&task_id)?;
                debug!(task = %task_id, removed, "remote task deleted");
            }
            PushEvent::Notification { notification } => {
                self.store.upsert(&notification)?;
                debug!(suggestion = %notification.id, kind = notification.kind.as_str(), "remote notification stored");
            }
        }
        Ok(())
    }
}

fn check_members(group: &Group, user_ids: &[String]) -> Result<()> {
    match user_ids.iter().find(|u| !group.is_member(u)) {
        Some(outsider) => Err(Error::Validation(format!(
            "{} is not a member of {}",
            outsider, group.id
        ))),
        None => Ok(()),
    }
}

fn display_name(users: &[User], user_id: &str) -> String {
    users
        .iter()
        .find(|u| u.id == user_id)
        .map_or_else(|| user_id.to_string(), |u| u.name.clone())
}

/// Members named by `@handle`, by id or by name without spaces, in order.
fn mentioned_members(text: &str, group: &Group, users: &[User]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in MENTION.captures_iter(text) {
        let handle = fold(&caps[1]);
        let member = group.members.iter().find(|m| {
            fold(m) == handle
                || users
                    .iter()
                    .any(|u| u.id == **m && fold(&u.name).replace(' ', "") == handle)
        });
        if let Some(member) = member {
            if !found.contains(member) {
                found.push(member.clone());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupScope;
    use crate::storage::{MemoryBackend, Storage};
    use crate::test_utils::{date, engine, wednesday};

    type TestEngine = Engine<Storage<MemoryBackend>, OfflineRemote>;

    fn team(engine: &mut TestEngine) -> Group {
        let group = engine.create_group("Planta", Context::Work, "ana").unwrap();
        engine.join_group(&group.invite_code, "beto").unwrap();
        engine.join_group(&group.invite_code, "cata").unwrap()
    }

    fn draft(group: &Group, title: &str, assignees: &[&str]) -> TaskDraft {
        TaskDraft {
            group_id: group.id.clone(),
            title: title.to_string(),
            assignees: assignees.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_task_detects_due_and_time_from_title() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Revisar bomba para el lunes 08:30", &[]), "ana")
            .unwrap();
        assert_eq!(task.due, Due::Date(date("2025-02-10")));
        assert_eq!(task.time.as_deref(), Some("08:30"));
        assert_eq!(task.status, TaskStatus::Upcoming);
        assert_eq!(task.assignees, vec!["ana"]);
        assert!(task.id.starts_with("ct-"));
    }

    #[test]
    fn test_create_task_defaults_to_today() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Limpiar filtros", &["beto", "beto"]), "ana")
            .unwrap();
        assert_eq!(task.due, Due::Today);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.assignees, vec!["beto"]);
    }

    #[test]
    fn test_create_task_requires_membership() {
        let mut engine = engine();
        let group = team(&mut engine);
        let err = engine
            .create_task(draft(&group, "x", &[]), "intruso")
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        let err = engine
            .create_task(draft(&group, "x", &["intruso"]), "ana")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_shared_completion_flow_awards_validator() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Inventario", &["ana", "beto"]), "ana")
            .unwrap();

        let requested = engine.main_action(&task.id, "ana").unwrap();
        assert_eq!(requested.outcome, ActionOutcome::ValidationRequested);
        assert_eq!(requested.suggestions.len(), 1);
        assert_eq!(requested.suggestions[0].kind.as_str(), "validation_request");

        let err = engine.main_action(&task.id, "ana").unwrap_err();
        assert!(matches!(err, Error::SelfValidation(_)));

        let done = engine.main_action(&task.id, "beto").unwrap();
        // medium 30 + on time 10 + shared 15
        assert_eq!(done.outcome, ActionOutcome::Completed { points: 55 });
        assert_eq!(engine.leaderboard(&group.id).unwrap()[0].user_id, "beto");
        assert_eq!(engine.leaderboard(&group.id).unwrap()[0].points, 55);

        let feed = engine.feed("cata", &Scope::all(Context::Work)).unwrap();
        assert!(feed.iter().all(|s| s.kind.as_str() != "validation_request"));
    }

    #[test]
    fn test_outsider_validation_leaves_task_and_ledger() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Inventario", &["ana", "beto"]), "ana")
            .unwrap();
        engine.main_action(&task.id, "ana").unwrap();
        let waiting = engine.task(&task.id).unwrap();

        let err = engine.main_action(&task.id, "extraño").unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        // cata belongs to the group but not to the task
        let err = engine.main_action(&task.id, "cata").unwrap_err();
        assert!(matches!(err, Error::Permission(_)));

        assert_eq!(engine.task(&task.id).unwrap(), waiting);
        let board = engine.leaderboard(&group.id).unwrap();
        assert!(board.iter().all(|e| e.points == 0));
        assert!(board.iter().all(|e| e.user_id != "extraño"));
    }

    #[test]
    fn test_restore_reverses_points() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Informe", &[]), "ana")
            .unwrap();
        engine.main_action(&task.id, "ana").unwrap();
        assert_eq!(engine.leaderboard(&group.id).unwrap()[0].points, 40);

        let again = engine.main_action(&task.id, "ana").unwrap();
        assert_eq!(again.outcome, ActionOutcome::RestoreRequired);

        let request = RestoreRequest {
            assignees: vec!["cata".into()],
            due: Due::Tomorrow,
            time: None,
        };
        let restored = engine.confirm_restore(&task.id, "ana", request).unwrap();
        assert_eq!(restored.outcome, ActionOutcome::Restored);
        assert_eq!(restored.task.status, TaskStatus::Pending);
        assert_eq!(restored.task.assignees, vec!["cata"]);
        let ana = engine
            .leaderboard(&group.id)
            .unwrap()
            .into_iter()
            .find(|e| e.user_id == "ana")
            .unwrap();
        assert_eq!(ana.points, 0);
    }

    #[test]
    fn test_second_postpone_raises_one_alert() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Calibrar sensores", &[]), "ana")
            .unwrap();

        let first = engine.postpone(&task.id, "ana", None).unwrap();
        assert!(first.suggestions.is_empty());
        let second = engine.postpone(&task.id, "ana", Some("falta repuesto")).unwrap();
        assert_eq!(second.suggestions.len(), 1);
        assert!(second.suggestions[0].is_system_alert_for(&task.id));

        let third = engine.postpone(&task.id, "ana", Some("sigue faltando")).unwrap();
        assert!(third.suggestions.is_empty());
        let alerts = engine
            .feed("ana", &Scope::all(Context::Work))
            .unwrap()
            .into_iter()
            .filter(|s| s.is_system_alert_for(&task.id))
            .count();
        assert_eq!(alerts, 1);
    }

    #[test]
    fn test_unavailable_action_leaves_task_alone() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine.create_task(draft(&group, "Podar", &[]), "ana").unwrap();
        engine.block(&task.id, "ana", "lluvia").unwrap();
        let result = engine.main_action(&task.id, "ana").unwrap();
        assert!(matches!(result.outcome, ActionOutcome::Unavailable { .. }));
        assert_eq!(engine.task(&task.id).unwrap().status, TaskStatus::Blocked);

        let unblocked = engine.unblock(&task.id, "ana").unwrap();
        assert_eq!(unblocked.task.status, TaskStatus::Pending);
        assert!(unblocked.task.blocked_by.is_none());
    }

    #[test]
    fn test_comment_mentions_target_members() {
        let mut engine = engine();
        let group = team(&mut engine);
        engine.add_user(User::new("cata", "Catalina Rojas")).unwrap();
        let task = engine.create_task(draft(&group, "Pintar", &[]), "ana").unwrap();

        let added = engine
            .add_comment(&task.id, "ana", "@beto y @CatalinaRojas revisen, @nadie no")
            .unwrap();
        // ana is the only assignee and wrote the comment
        assert_eq!(added.task.unread_comments, 0);
        let reply = engine.add_comment(&task.id, "beto", "listo").unwrap();
        assert_eq!(reply.task.unread_comments, 1);
        let targets: Vec<&str> = added
            .mentions
            .iter()
            .filter_map(|s| s.user_id.as_deref())
            .collect();
        assert_eq!(targets, vec!["beto", "cata"]);

        let other_scope = Scope::new(GroupScope::Group("otro".into()), Context::Personal);
        assert_eq!(engine.feed("cata", &other_scope).unwrap().len(), 1);
        assert!(engine.feed("ana", &other_scope).unwrap().is_empty());

        assert_eq!(engine.mark_comments_read(&task.id).unwrap().unread_comments, 0);
    }

    #[test]
    fn test_leave_notifies_creator_only() {
        let mut engine = engine();
        let group = team(&mut engine);
        let left = engine.leave_group(&group.id, "beto").unwrap();
        assert!(!left.group.is_member("beto"));
        assert_eq!(left.notification.user_id.as_deref(), Some("ana"));
        assert!(matches!(
            engine.leave_group(&group.id, "ana").unwrap_err(),
            Error::Validation(_)
        ));
        let scope = Scope::all(Context::Work);
        assert_eq!(engine.feed("ana", &scope).unwrap().len(), 1);
        assert!(engine.feed("cata", &scope).unwrap().is_empty());
    }

    #[test]
    fn test_delete_group_cascades() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Auditar", &["ana", "beto"]), "ana")
            .unwrap();
        engine.main_action(&task.id, "ana").unwrap();

        assert!(matches!(
            engine.delete_group(&group.id, "beto").unwrap_err(),
            Error::Permission(_)
        ));
        let deleted = engine.delete_group(&group.id, "ana").unwrap();
        assert_eq!(deleted.tasks_removed, 1);
        assert_eq!(deleted.suggestions_removed, 1);
        assert!(matches!(engine.task(&task.id).unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_join_unknown_code() {
        let mut engine = engine();
        team(&mut engine);
        assert!(matches!(
            engine.join_group("ZZZZZZ", "dani").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_dismiss_checks_target() {
        let mut engine = engine();
        let group = team(&mut engine);
        let left = engine.leave_group(&group.id, "cata").unwrap();
        let id = left.notification.id;
        assert!(matches!(
            engine.dismiss_suggestion(&id, "beto").unwrap_err(),
            Error::Permission(_)
        ));
        engine.dismiss_suggestion(&id, "ana").unwrap();
        assert!(engine.feed("ana", &Scope::all(Context::Work)).unwrap().is_empty());
    }

    #[test]
    fn test_summary_and_weekly_follow_scope() {
        let mut engine = engine();
        let work = team(&mut engine);
        let home = engine.create_group("Casa", Context::Personal, "ana").unwrap();
        engine.create_task(draft(&work, "Turno noche", &[]), "ana").unwrap();
        let mut late = draft(&home, "Pagar cuentas", &[]);
        late.due = Some(Due::Yesterday);
        engine.create_task(late, "ana").unwrap();

        let work_summary = engine.summary(&Scope::all(Context::Work)).unwrap();
        assert_eq!(work_summary.counts.overdue, 0);
        let home_summary = engine.summary(&Scope::all(Context::Personal)).unwrap();
        assert_eq!(home_summary.counts.overdue, 1);

        let report = engine
            .weekly_report(&Scope::all(Context::Personal), &mut FixedGreeting(0))
            .unwrap();
        assert_eq!(report.should_have_completed, 1);
        assert_eq!(report.ranking.len(), 1);
        assert_eq!(report.window_end, wednesday());
    }

    #[test]
    fn test_push_merge_counts_unread_and_respects_in_flight() {
        let mut engine = engine();
        let group = team(&mut engine);
        let task = engine
            .create_task(draft(&group, "Revisar", &["ana", "beto"]), "ana")
            .unwrap();

        let mut incoming = task.clone();
        incoming.status = TaskStatus::Blocked;
        incoming.comments.push(Comment {
            id: "c1".into(),
            user: "Beto".into(),
            avatar: None,
            user_id: "beto".into(),
            text: "listo".into(),
            timestamp: "05/02 12:00".into(),
        });

        engine.hold_edit(&task.id);
        engine
            .apply_push(PushEvent::TaskUpdated { task: Box::new(incoming.clone()) }, "ana")
            .unwrap();
        let merged = engine.task(&task.id).unwrap();
        assert_eq!(merged.status, TaskStatus::Pending);
        assert_eq!(merged.unread_comments, 1);
        engine.release_edit(&task.id);

        engine
            .apply_push(PushEvent::TaskDeleted { task_id: task.id.clone() }, "ana")
            .unwrap();
        assert!(engine.task(&task.id).is_err());
    }

    /// Remote that rejects writes on demand.
    #[derive(Default)]
    struct FlakyRemote {
        inner: OfflineRemote,
        fail_updates: bool,
        fail_scores: bool,
    }

    impl Remote for FlakyRemote {
        fn create_task(&mut self, draft: &Task) -> Result<Task> {
            self.inner.create_task(draft)
        }
        fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<()> {
            if self.fail_updates {
                return Err(Error::Other("offline".into()));
            }
            self.inner.update_task(id, patch)
        }
        fn delete_task(&mut self, id: &str) -> Result<()> {
            self.inner.delete_task(id)
        }
        fn list_tasks_by_group(&mut self, group_id: &str) -> Result<Vec<Task>> {
            self.inner.list_tasks_by_group(group_id)
        }
        fn create_group(&mut self, draft: &Group) -> Result<Group> {
            self.inner.create_group(draft)
        }
        fn list_groups(&mut self) -> Result<Vec<Group>> {
            self.inner.list_groups()
        }
        fn join_group(&mut self, code: &str, user_id: &str) -> Result<Option<Group>> {
            self.inner.join_group(code, user_id)
        }
        fn leave_group(&mut self, group_id: &str, user_id: &str) -> Result<()> {
            self.inner.leave_group(group_id, user_id)
        }
        fn delete_group(&mut self, group_id: &str) -> Result<()> {
            self.inner.delete_group(group_id)
        }
        fn apply_score_delta(&mut self, group_id: &str, user_id: &str, delta: i64) -> Result<()> {
            if self.fail_scores {
                return Err(Error::Other("offline".into()));
            }
            self.inner.apply_score_delta(group_id, user_id, delta)
        }
        fn publish(&mut self, suggestion: &Suggestion) -> Result<()> {
            self.inner.publish(suggestion)
        }
    }

    fn flaky_engine() -> Engine<Storage<MemoryBackend>, FlakyRemote> {
        Engine::new(
            Storage::in_memory(),
            FlakyRemote::default(),
            Box::new(FixedClock::on(wednesday())),
        )
    }

    #[test]
    fn test_remote_failure_reverts_task() {
        let mut engine = flaky_engine();
        let group = engine.create_group("Planta", Context::Work, "ana").unwrap();
        let task = engine
            .create_task(draft(&group, "Cambiar aceite", &[]), "ana")
            .unwrap();

        engine.remote_mut().fail_updates = true;
        let err = engine.block(&task.id, "ana", "sin stock").unwrap_err();
        assert!(matches!(err, Error::RemoteSync(_)));
        assert_eq!(engine.task(&task.id).unwrap(), task);
    }

    #[test]
    fn test_ledger_failure_reverts_completion() {
        let mut engine = flaky_engine();
        let group = engine.create_group("Planta", Context::Work, "ana").unwrap();
        let task = engine
            .create_task(draft(&group, "Cambiar aceite", &[]), "ana")
            .unwrap();

        engine.remote_mut().fail_scores = true;
        let err = engine.main_action(&task.id, "ana").unwrap_err();
        assert!(matches!(err, Error::RemoteSync(_)));
        assert_eq!(engine.task(&task.id).unwrap().status, TaskStatus::Pending);
        assert_eq!(engine.leaderboard(&group.id).unwrap()[0].points, 0);
    }
}
