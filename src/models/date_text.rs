//! Due date detection from free-form task titles.
//!
//! Titles are written in Spanish, so detection looks for phrases such as
//! "para el lunes", "antes del viernes", "mañana" or "hoy". Matching ignores
//! case and accents.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use crewtask::models::date_text::detect_date_from_text;
//!
//! // 2025-02-05 is a Wednesday
//! let today = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
//! let due = detect_date_from_text("reunión para el lunes", today);
//! assert_eq!(due, NaiveDate::from_ymd_opt(2025, 2, 10));
//! ```

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// "(antes del|para el|el|hasta el) <weekday>" on folded text.
static WEEKDAY_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:antes del|para el|hasta el|el)\s+(lunes|martes|miercoles|jueves|viernes|sabado|domingo)\b",
    )
    .expect("weekday phrase pattern is valid")
});

/// "H:MM", "HH:MM" or "HHhMM".
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[:h](\d{2})\b").expect("clock time pattern is valid")
});

/// Lowercase and strip diacritics ("Miércoles" -> "miercoles", "mañana" -> "manana").
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Map a (folded) Spanish weekday name to a weekday.
pub fn spanish_weekday(name: &str) -> Option<Weekday> {
    match fold(name).as_str() {
        "lunes" => Some(Weekday::Mon),
        "martes" => Some(Weekday::Tue),
        "miercoles" => Some(Weekday::Wed),
        "jueves" => Some(Weekday::Thu),
        "viernes" => Some(Weekday::Fri),
        "sabado" => Some(Weekday::Sat),
        "domingo" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Weekday number with Sunday = 0, Monday = 1 ... Saturday = 6.
pub fn day_number(weekday: Weekday) -> u32 {
    weekday.num_days_from_sunday()
}

/// The next date strictly after `from` that falls on `target`.
/// Naming today's weekday rolls forward a full week.
pub fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let current = day_number(from.weekday());
    let wanted = day_number(target);
    let mut ahead = (wanted + 7 - current) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    from + Duration::days(i64::from(ahead))
}

/// Detect a due date in free-form text.
///
/// Rules, first match wins:
/// 1. "(antes del|para el|el|hasta el) <weekday>" -> next such weekday after today
/// 2. contains "mañana" -> tomorrow
/// 3. contains "hoy" -> today
pub fn detect_date_from_text(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let folded = fold(text);

    if let Some(caps) = WEEKDAY_PHRASE.captures(&folded) {
        if let Some(weekday) = caps.get(1).and_then(|m| spanish_weekday(m.as_str())) {
            return Some(next_weekday(today, weekday));
        }
    }

    if folded.contains("manana") {
        return Some(today + Duration::days(1));
    }

    if folded.contains("hoy") {
        return Some(today);
    }

    None
}

/// Detect a clock time for display, normalised to "HH:MM".
///
/// Independent of date detection; out-of-range values are ignored.
pub fn detect_time_from_text(text: &str) -> Option<String> {
    CLOCK_TIME.captures_iter(text).find_map(|caps| {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        (hour < 24 && minute < 60).then(|| format!("{:02}:{:02}", hour, minute))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, wednesday};

    #[test]
    fn test_para_el_lunes_on_wednesday_is_five_days_ahead() {
        assert_eq!(
            detect_date_from_text("reunión para el lunes", wednesday()),
            Some(date("2025-02-10"))
        );
    }

    #[test]
    fn test_same_weekday_rolls_forward_a_week() {
        assert_eq!(
            detect_date_from_text("entregar el miércoles", wednesday()),
            Some(date("2025-02-12"))
        );
    }

    #[test]
    fn test_weekday_phrases_are_accent_and_case_insensitive() {
        let today = wednesday();
        assert_eq!(
            detect_date_from_text("Informe ANTES DEL Sábado", today),
            Some(date("2025-02-08"))
        );
        assert_eq!(
            detect_date_from_text("revisar hasta el viernes", today),
            Some(date("2025-02-07"))
        );
        assert_eq!(
            detect_date_from_text("limpieza el domingo", today),
            Some(date("2025-02-09"))
        );
        assert_eq!(
            detect_date_from_text("llamar el jueves", today),
            Some(date("2025-02-06"))
        );
    }

    #[test]
    fn test_bare_weekday_without_preposition_is_ignored() {
        assert_eq!(detect_date_from_text("lunes de inventario", wednesday()), None);
    }

    #[test]
    fn test_weekday_phrase_beats_manana() {
        assert_eq!(
            detect_date_from_text("mañana no, para el martes", wednesday()),
            Some(date("2025-02-11"))
        );
    }

    #[test]
    fn test_manana_and_hoy() {
        let today = wednesday();
        assert_eq!(detect_date_from_text("mañana", today), Some(date("2025-02-06")));
        assert_eq!(detect_date_from_text("Comprar pan MANANA", today), Some(date("2025-02-06")));
        assert_eq!(detect_date_from_text("hoy", today), Some(today));
        assert_eq!(detect_date_from_text("cerrar caja HOY", today), Some(today));
    }

    #[test]
    fn test_no_date_in_text() {
        assert_eq!(detect_date_from_text("actualizar inventario", wednesday()), None);
        assert_eq!(detect_date_from_text("", wednesday()), None);
    }

    #[test]
    fn test_day_numbers_follow_sunday_zero_convention() {
        assert_eq!(day_number(Weekday::Sun), 0);
        assert_eq!(day_number(Weekday::Mon), 1);
        assert_eq!(day_number(Weekday::Sat), 6);
    }

    #[test]
    fn test_detect_time_formats() {
        assert_eq!(detect_time_from_text("reunión a las 9:30"), Some("09:30".to_string()));
        assert_eq!(detect_time_from_text("turno 14h15"), Some("14:15".to_string()));
        assert_eq!(detect_time_from_text("llamada 08:05 hoy"), Some("08:05".to_string()));
        assert_eq!(detect_time_from_text("sala 25:00"), None);
        assert_eq!(detect_time_from_text("sin hora"), None);
    }
}
