//! Weekly report over the trailing seven days.
//!
//! Only the opening greeting is random; it is drawn through a
//! [`GreetingSource`] so tests can pin it.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;

use crate::models::{Task, TaskStatus, User};

/// Days before today included in the window.
pub const WINDOW_DAYS: i64 = 7;

/// Opening lines, one chosen per report.
pub const GREETINGS: [&str; 4] = [
    "📊 ¡Hola equipo! Este es el resumen de la semana.",
    "📅 Cerramos otra semana. Veamos cómo nos fue.",
    "🚀 Resumen semanal listo. ¡Vamos con los números!",
    "☕ Un café y el balance de los últimos siete días.",
];

/// Chooses which greeting opens a report.
pub trait GreetingSource {
    /// An index in `0..choices`.
    fn pick(&mut self, choices: usize) -> usize;
}

/// Uniformly random greeting.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomGreeting;

impl GreetingSource for RandomGreeting {
    fn pick(&mut self, choices: usize) -> usize {
        if choices == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..choices)
    }
}

/// Always the same greeting.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedGreeting(pub usize);

impl GreetingSource for FixedGreeting {
    fn pick(&mut self, choices: usize) -> usize {
        if choices == 0 { 0 } else { self.0 % choices }
    }
}

/// Category with the most overdue tasks in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bottleneck {
    pub category: String,
    pub overdue: usize,
}

/// Per-member tallies for the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub user_id: String,
    pub name: String,
    pub completed: usize,
    pub overdue: usize,
    pub completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Tasks due inside the window
    pub total: usize,
    pub completed: usize,
    /// Due before today and still not completed
    pub should_have_completed: usize,
    pub completion_rate: u32,
    pub bottleneck: Option<Bottleneck>,
    pub ranking: Vec<MemberStats>,
    pub text: String,
}

/// `round(100 * done / (done + missed))`, or 100 when there is nothing to measure.
pub fn completion_rate(done: usize, missed: usize) -> u32 {
    let total = done + missed;
    if total == 0 {
        return 100;
    }
    (100.0 * done as f64 / total as f64).round() as u32
}

const UNCATEGORIZED: &str = "Sin categoría";

fn find_bottleneck(overdue: &[&Task]) -> Option<Bottleneck> {
    let mut tally: Vec<(String, usize)> = Vec::new();
    for task in overdue {
        let category = if task.category.is_empty() {
            UNCATEGORIZED
        } else {
            task.category.as_str()
        };
        match tally.iter_mut().find(|(c, _)| c == category) {
            Some((_, n)) => *n += 1,
            None => tally.push((category.to_string(), 1)),
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (category, count) in tally {
        // strictly greater keeps the first category on ties
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((category, count));
        }
    }
    best.map(|(category, overdue)| Bottleneck { category, overdue })
}

fn rank_members(members: &[User], completed: &[&Task], overdue: &[&Task]) -> Vec<MemberStats> {
    let mut ranking: Vec<MemberStats> = members
        .iter()
        .filter_map(|member| {
            let done = completed.iter().filter(|t| t.is_assignee(&member.id)).count();
            let missed = overdue.iter().filter(|t| t.is_assignee(&member.id)).count();
            (done + missed > 0).then(|| MemberStats {
                user_id: member.id.clone(),
                name: member.name.clone(),
                completed: done,
                overdue: missed,
                completion_rate: completion_rate(done, missed),
            })
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.completed
            .cmp(&a.completed)
            .then_with(|| b.completion_rate.cmp(&a.completion_rate))
    });
    ranking
}

fn banner(rate: u32) -> String {
    if rate >= 85 {
        format!("🏆 Tasa de cumplimiento: {}%. ¡Semana excelente!", rate)
    } else if rate >= 70 {
        format!("👍 Tasa de cumplimiento: {}%. Buena semana, aún hay margen.", rate)
    } else {
        format!("⚠️ Tasa de cumplimiento: {}%. Quedaron tareas atrasadas.", rate)
    }
}

/// Build the weekly report for `tasks` (already restricted to the active
/// scope) and the team `members`.
pub fn generate_weekly_report(
    tasks: &[Task],
    members: &[User],
    today: NaiveDate,
    greeting: &mut dyn GreetingSource,
) -> WeeklyReport {
    let window_start = today - Duration::days(WINDOW_DAYS);
    let in_window: Vec<&Task> = tasks
        .iter()
        .filter(|t| {
            t.due_date(today)
                .is_some_and(|due| due >= window_start && due <= today)
        })
        .collect();

    let completed: Vec<&Task> = in_window
        .iter()
        .copied()
        .filter(|t| t.status == TaskStatus::Completed)
        .collect();
    let overdue: Vec<&Task> = in_window
        .iter()
        .copied()
        .filter(|t| t.is_overdue(today))
        .collect();

    let rate = completion_rate(completed.len(), overdue.len());
    let bottleneck = find_bottleneck(&overdue);
    let ranking = rank_members(members, &completed, &overdue);

    let mut lines = vec![GREETINGS[greeting.pick(GREETINGS.len())].to_string(), banner(rate)];
    lines.push(format!(
        "Completadas: {} · Debieron completarse: {}",
        completed.len(),
        overdue.len()
    ));
    if let Some(b) = &bottleneck {
        lines.push(format!(
            "🧱 Cuello de botella: {} ({} vencidas).",
            b.category, b.overdue
        ));
    }
    const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
    for (medal, member) in MEDALS.iter().zip(&ranking) {
        lines.push(format!(
            "{} {}: {} completadas ({}%)",
            medal, member.name, member.completed, member.completion_rate
        ));
    }
    match ranking.first() {
        Some(top) => lines.push(format!("👏 Destacado de la semana: {}.", top.name)),
        None => lines.push("Sin actividad registrada esta semana.".to_string()),
    }

    WeeklyReport {
        window_start,
        window_end: today,
        total: in_window.len(),
        completed: completed.len(),
        should_have_completed: overdue.len(),
        completion_rate: rate,
        bottleneck,
        ranking,
        text: lines.join("\n"),
    }
}
