//! Daily digest of a task set.
//!
//! The digest is a fixed sequence of sections, each present only when the
//! situation it describes exists, ending with a single recommendation.
//! Output depends only on the tasks and "today".

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::scoring::rank_by_urgency;
use crate::models::{CATEGORY_CRITICAL, Task, TaskStatus};

/// How many tasks the ranking keeps.
pub const TOP_TASKS: usize = 5;

/// Overdue tasks named in the call to action.
const NAMED_OVERDUE: usize = 2;

/// Sizes of each partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub overdue: usize,
    pub blocked: usize,
    pub waiting_validation: usize,
    pub postponed: usize,
    pub critical: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Section identifiers, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Greeting,
    Completed,
    Overdue,
    Blocked,
    Validation,
    Postponed,
    Critical,
    MostRelevant,
    PendingRecap,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummarySection {
    pub kind: SectionKind,
    pub text: String,
}

/// The closing advice, by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Overdue,
    Blocked,
    Validation,
    General,
}

impl Recommendation {
    fn text(&self) -> &'static str {
        match self {
            Self::Overdue => "💡 Recomendación: empieza por las tareas vencidas.",
            Self::Blocked => {
                "💡 Recomendación: destraba las tareas bloqueadas antes de tomar trabajo nuevo."
            }
            Self::Validation => {
                "💡 Recomendación: valida el trabajo de tus compañeros para cerrar tareas."
            }
            Self::General => "💡 Recomendación: mantén el ritmo y revisa las próximas tareas.",
        }
    }
}

/// A ranked task as reported in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopTask {
    pub id: String,
    pub title: String,
    pub score: i32,
}

/// The generated digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub counts: SummaryCounts,
    pub top_tasks: Vec<TopTask>,
    pub recommendation: Recommendation,
    pub sections: Vec<SummarySection>,
    /// Sections joined with blank lines
    pub text: String,
}

impl Summary {
    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.sections.iter().any(|s| s.kind == kind)
    }
}

struct Partition<'a> {
    overdue: Vec<&'a Task>,
    blocked: Vec<&'a Task>,
    waiting: Vec<&'a Task>,
    postponed: Vec<&'a Task>,
    critical: Vec<&'a Task>,
    completed: Vec<&'a Task>,
    pending: Vec<&'a Task>,
}

impl<'a> Partition<'a> {
    fn of(tasks: &'a [Task], today: NaiveDate) -> Self {
        let mut p = Partition {
            overdue: Vec::new(),
            blocked: Vec::new(),
            waiting: Vec::new(),
            postponed: Vec::new(),
            critical: Vec::new(),
            completed: Vec::new(),
            pending: Vec::new(),
        };
        for task in tasks {
            let overdue = task.is_overdue(today);
            let completed = task.status == TaskStatus::Completed;
            if overdue {
                p.overdue.push(task);
            }
            if task.status == TaskStatus::Blocked {
                p.blocked.push(task);
            }
            if task.status == TaskStatus::WaitingValidation {
                p.waiting.push(task);
            }
            if task.postpone_count >= 2 {
                p.postponed.push(task);
            }
            if task.category == CATEGORY_CRITICAL && !overdue && !completed {
                p.critical.push(task);
            }
            if completed {
                p.completed.push(task);
            }
            if matches!(task.status, TaskStatus::Pending | TaskStatus::WaitingValidation) {
                p.pending.push(task);
            }
        }
        p
    }

    fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            overdue: self.overdue.len(),
            blocked: self.blocked.len(),
            waiting_validation: self.waiting.len(),
            postponed: self.postponed.len(),
            critical: self.critical.len(),
            completed: self.completed.len(),
            pending: self.pending.len(),
        }
    }
}

fn plural<'s>(n: usize, one: &'s str, many: &'s str) -> &'s str {
    if n == 1 { one } else { many }
}

/// «A», «A» y «B», or «A», «B» y N más.
fn name_tasks(titles: &[&str], total: usize) -> String {
    let quoted: Vec<String> = titles.iter().map(|t| format!("«{}»", t)).collect();
    let rest = total.saturating_sub(quoted.len());
    match (quoted.as_slice(), rest) {
        ([only], 0) => only.clone(),
        ([a, b], 0) => format!("{} y {}", a, b),
        (named, rest) => format!("{} y {} más", named.join(", "), rest),
    }
}

/// Build the daily digest for `tasks`.
pub fn generate_intelligent_summary(tasks: &[Task], today: NaiveDate) -> Summary {
    let partition = Partition::of(tasks, today);
    let counts = partition.counts();

    let open: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .cloned()
        .collect();
    let top_tasks: Vec<TopTask> = rank_by_urgency(&open, today)
        .into_iter()
        .take(TOP_TASKS)
        .map(|r| TopTask {
            id: r.task.id.clone(),
            title: r.task.title.clone(),
            score: r.score,
        })
        .collect();

    let mut sections = Vec::new();
    let mut push = |kind: SectionKind, text: String| sections.push(SummarySection { kind, text });

    push(
        SectionKind::Greeting,
        "👋 ¡Hola! Este es el resumen de tus tareas.".to_string(),
    );

    if counts.completed > 0 {
        push(
            SectionKind::Completed,
            format!(
                "✅ ¡Buen trabajo! Ya completaste {} {}.",
                counts.completed,
                plural(counts.completed, "tarea", "tareas")
            ),
        );
    }

    if counts.overdue > 0 {
        let ranked: Vec<Task> = partition.overdue.iter().map(|t| (*t).clone()).collect();
        let ranked = rank_by_urgency(&ranked, today);
        let titles: Vec<&str> = ranked
            .iter()
            .take(NAMED_OVERDUE)
            .map(|r| r.task.title.as_str())
            .collect();
        push(
            SectionKind::Overdue,
            format!(
                "🚨 Tienes {} {}: {}. Conviene resolverlas cuanto antes.",
                counts.overdue,
                plural(counts.overdue, "tarea vencida", "tareas vencidas"),
                name_tasks(&titles, counts.overdue)
            ),
        );
    }

    if counts.blocked > 0 {
        push(
            SectionKind::Blocked,
            format!(
                "⛔ {} {}. Revisa qué las frena y quién puede destrabarlas.",
                counts.blocked,
                plural(counts.blocked, "tarea bloqueada", "tareas bloqueadas")
            ),
        );
    }

    if counts.waiting_validation > 0 {
        push(
            SectionKind::Validation,
            format!(
                "⏳ {} {} validación de un compañero.",
                counts.waiting_validation,
                plural(counts.waiting_validation, "tarea espera", "tareas esperan")
            ),
        );
    }

    if counts.postponed > 0 {
        push(
            SectionKind::Postponed,
            format!(
                "🔁 {} {} pospuesto dos o más veces. Puede ser momento de una reunión de coordinación.",
                counts.postponed,
                plural(counts.postponed, "tarea se ha", "tareas se han")
            ),
        );
    }

    if counts.critical > 0 && counts.overdue == 0 {
        push(
            SectionKind::Critical,
            format!(
                "🔥 {} {} en curso. Mantenlas en la mira.",
                counts.critical,
                plural(counts.critical, "tarea crítica", "tareas críticas")
            ),
        );
    }

    let attention =
        counts.overdue + counts.blocked + counts.waiting_validation + counts.postponed;
    if attention == 0 && !top_tasks.is_empty() {
        let lines: Vec<String> = top_tasks
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.title))
            .collect();
        push(
            SectionKind::MostRelevant,
            format!("📌 Las tareas más relevantes ahora:\n{}", lines.join("\n")),
        );
    }

    if counts.pending > 0 {
        push(
            SectionKind::PendingRecap,
            format!(
                "📋 Quedan {} {}.",
                counts.pending,
                plural(counts.pending, "tarea pendiente", "tareas pendientes")
            ),
        );
    }

    let recommendation = if counts.overdue > 0 {
        Recommendation::Overdue
    } else if counts.blocked > 0 {
        Recommendation::Blocked
    } else if counts.waiting_validation > 0 {
        Recommendation::Validation
    } else {
        Recommendation::General
    };
    push(SectionKind::Recommendation, recommendation.text().to_string());

    let text = sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Summary {
        counts,
        top_tasks,
        recommendation,
        sections,
        text,
    }
}
