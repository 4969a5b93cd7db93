//! Common utilities for document generation.
//!
//! Lunch-break arithmetic, Italian calendar vocabulary, filename and XML
//! helpers shared by the renderer, the builders and the packager.

use chrono::{Datelike, Local, NaiveDate};

use crate::course::Sessione;

/// Start of the unpaid lunch break, in minutes after midnight (13:00).
pub const BREAK_START: u32 = 13 * 60;
/// End of the unpaid lunch break, in minutes after midnight (14:00).
pub const BREAK_END: u32 = 14 * 60;

/// Upper bound for a single sanitized filename component.
pub const MAX_FILENAME_LENGTH: usize = 100;

const MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

const WEEKDAYS: [&str; 7] = [
    "lunedì",
    "martedì",
    "mercoledì",
    "giovedì",
    "venerdì",
    "sabato",
    "domenica",
];

/// Parse `HH:MM` (also `H:MM` and `HH.MM`) into minutes after midnight.
pub fn parse_time(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let (hours, minutes) = trimmed
        .split_once(':')
        .or_else(|| trimmed.split_once('.'))?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Format minutes after midnight as `HH:MM`.
pub fn format_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Minutes of `[start, end)` that fall inside the lunch break.
fn break_overlap(start: u32, end: u32) -> u32 {
    let lo = start.max(BREAK_START);
    let hi = end.min(BREAK_END);
    hi.saturating_sub(lo)
}

/// Worked minutes between two `HH:MM` strings, lunch break excluded.
///
/// Unparseable input and intervals ending before they start yield 0.
pub fn duration_minutes(start: &str, end: &str) -> u32 {
    match (parse_time(start), parse_time(end)) {
        (Some(s), Some(e)) if e > s => (e - s).saturating_sub(break_overlap(s, e)),
        _ => 0,
    }
}

/// Worked hours between two `HH:MM` strings, lunch break excluded, rounded
/// to the nearest whole hour.
pub fn duration_hours(start: &str, end: &str) -> u32 {
    let minutes = duration_minutes(start, end);
    (minutes + 30) / 60
}

/// Split a session that crosses the lunch break into a morning part ending
/// at 13:00 and an afternoon part starting at 14:00.
///
/// Sessions entirely before 13:00 or entirely from 14:00 onwards, and
/// sessions whose times cannot be parsed, come back unchanged as the only
/// element. A session lying fully inside the break yields no parts.
pub fn split_across_break(session: &Sessione) -> Vec<Sessione> {
    let (Some(start), Some(end)) = (parse_time(&session.ora_inizio), parse_time(&session.ora_fine))
    else {
        return vec![session.clone()];
    };

    if end <= BREAK_START || start >= BREAK_END {
        return vec![session.clone()];
    }

    let mut parts = Vec::with_capacity(2);
    if start < BREAK_START {
        parts.push(with_times(session, start, BREAK_START));
    }
    if end > BREAK_END {
        parts.push(with_times(session, BREAK_END, end));
    }
    parts
}

fn with_times(session: &Sessione, start: u32, end: u32) -> Sessione {
    let mut part = session.clone();
    part.ora_inizio = format_time(start);
    part.ora_fine = format_time(end);
    part.durata = Some(duration_hours(&part.ora_inizio, &part.ora_fine).to_string());
    part
}

/// Schedule of a session as `"HH:MM - HH:MM"`, parts joined with `" / "`
/// when the session spans the lunch break.
pub fn schedule_range(session: &Sessione) -> String {
    split_across_break(session)
        .iter()
        .map(|part| format!("{} - {}", part.ora_inizio, part.ora_fine))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Parse a `DD/MM/YYYY` date. ISO `YYYY-MM-DD` is accepted as a fallback.
pub fn parse_italian_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}

/// Italian month name for a 1-based month number; empty when out of range.
pub fn italian_month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTHS.get(idx as usize))
        .copied()
        .unwrap_or("")
}

/// Italian weekday name for a date.
pub fn italian_weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

/// Long Italian form of a date: `lunedì 3 marzo 2025`.
pub fn format_long_date(date: NaiveDate) -> String {
    format!(
        "{} {} {} {}",
        italian_weekday_name(date),
        date.day(),
        italian_month_name(date.month()),
        date.year()
    )
}

/// Long Italian form of a `DD/MM/YYYY` string. Unparseable input is
/// returned as given.
pub fn format_italian_date(value: &str) -> String {
    parse_italian_date(value)
        .map(format_long_date)
        .unwrap_or_else(|| value.trim().to_string())
}

/// Today's date as `DD/MM/YYYY`.
pub fn today_italian() -> String {
    Local::now().date_naive().format("%d/%m/%Y").to_string()
}

/// Escape text for inclusion in XML character data or attribute values.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Sanitize a string for use as a filename component.
///
/// Removes `/ \ : * ? " < > |` and control characters, collapses runs of
/// whitespace and underscores into one underscore and truncates to
/// [`MAX_FILENAME_LENGTH`] characters.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_underscore = false;

    for ch in name.trim().chars() {
        if matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || ch.is_control() {
            continue;
        }
        if ch.is_whitespace() || ch == '_' {
            if !last_underscore && !result.is_empty() {
                result.push('_');
                last_underscore = true;
            }
            continue;
        }
        result.push(ch);
        last_underscore = false;
    }

    let truncated: String = result.chars().take(MAX_FILENAME_LENGTH).collect();
    let cleaned = truncated.trim_matches(|c| c == '_' || c == '.').to_string();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// A `DD/MM/YYYY` date made safe for file and folder names (`DD-MM-YYYY`).
pub fn date_for_filename(date: &str) -> String {
    sanitize_filename(&date.trim().replace('/', "-"), "senza-data")
}

/// One calendar day of a beneficiary schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub data: String,
    pub giorno_settimana: String,
    /// Morning segment `(start, end)`, ending at 13:00 at the latest.
    pub mattina: Option<(String, String)>,
    /// Afternoon segment `(start, end)`, starting at 14:00 at the earliest.
    pub pomeriggio: Option<(String, String)>,
    pub ore: u32,
}

impl CalendarDay {
    pub fn mattina_label(&self) -> String {
        segment_label(&self.mattina)
    }

    pub fn pomeriggio_label(&self) -> String {
        segment_label(&self.pomeriggio)
    }
}

fn segment_label(segment: &Option<(String, String)>) -> String {
    segment
        .as_ref()
        .map(|(start, end)| format!("{} - {}", start, end))
        .unwrap_or_default()
}

/// Group sessions by date into morning and afternoon segments.
///
/// The day total is the span from the first start to the last end, minus
/// one flat hour whenever both segments exist.
pub fn calendar_days<'a>(sessions: impl IntoIterator<Item = &'a Sessione>) -> Vec<CalendarDay> {
    let mut order: Vec<String> = Vec::new();
    let mut parts_by_day: Vec<Vec<(u32, u32)>> = Vec::new();

    for session in sessions {
        let date = session.data_completa.trim().to_string();
        let idx = match order.iter().position(|d| *d == date) {
            Some(idx) => idx,
            None => {
                order.push(date);
                parts_by_day.push(Vec::new());
                order.len() - 1
            }
        };
        for part in split_across_break(session) {
            if let (Some(start), Some(end)) = (parse_time(&part.ora_inizio), parse_time(&part.ora_fine)) {
                if end > start {
                    parts_by_day[idx].push((start, end));
                }
            }
        }
    }

    order
        .into_iter()
        .zip(parts_by_day)
        .map(|(data, parts)| {
            let segment = |morning: bool| {
                let selected: Vec<&(u32, u32)> = parts
                    .iter()
                    .filter(|(start, _)| (*start < BREAK_START) == morning)
                    .collect();
                let start = selected.iter().map(|(s, _)| *s).min()?;
                let end = selected.iter().map(|(_, e)| *e).max()?;
                Some((start, end))
            };
            let mattina = segment(true);
            let pomeriggio = segment(false);

            let first = parts.iter().map(|(s, _)| *s).min();
            let last = parts.iter().map(|(_, e)| *e).max();
            let mut ore = match (first, last) {
                (Some(first), Some(last)) => (last - first + 30) / 60,
                _ => 0,
            };
            if mattina.is_some() && pomeriggio.is_some() {
                ore = ore.saturating_sub(1);
            }

            CalendarDay {
                giorno_settimana: parse_italian_date(&data)
                    .map(|d| italian_weekday_name(d).to_string())
                    .unwrap_or_default(),
                data,
                mattina: mattina.map(|(s, e)| (format_time(s), format_time(e))),
                pomeriggio: pomeriggio.map(|(s, e)| (format_time(s), format_time(e))),
                ore,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: &str, end: &str) -> Sessione {
        Sessione {
            numero: 1,
            data_completa: "10/03/2025".to_string(),
            ora_inizio: start.to_string(),
            ora_fine: end.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_duration_full_day_subtracts_break() {
        assert_eq!(duration_hours("09:00", "18:00"), 8);
    }

    #[test]
    fn test_duration_morning_only() {
        assert_eq!(duration_hours("09:00", "12:00"), 3);
    }

    #[test]
    fn test_duration_inside_break_is_zero() {
        assert_eq!(duration_hours("13:30", "13:45"), 0);
    }

    #[test]
    fn test_duration_negative_interval_is_zero() {
        assert_eq!(duration_hours("18:00", "09:00"), 0);
        assert_eq!(duration_hours("nope", "09:00"), 0);
    }

    #[test]
    fn test_duration_partial_overlap() {
        // 12:00-15:00 is 3h elapsed, 1h of break
        assert_eq!(duration_hours("12:00", "15:00"), 2);
        assert_eq!(duration_minutes("12:30", "13:30"), 30);
    }

    #[test]
    fn test_split_outside_break_is_identity() {
        let morning = session("09:00", "13:00");
        assert_eq!(split_across_break(&morning), vec![morning.clone()]);

        let afternoon = session("14:00", "17:00");
        assert_eq!(split_across_break(&afternoon), vec![afternoon.clone()]);
    }

    #[test]
    fn test_split_full_day() {
        let parts = split_across_break(&session("09:00", "18:00"));
        assert_eq!(parts.len(), 2);
        assert_eq!((parts[0].ora_inizio.as_str(), parts[0].ora_fine.as_str()), ("09:00", "13:00"));
        assert_eq!((parts[1].ora_inizio.as_str(), parts[1].ora_fine.as_str()), ("14:00", "18:00"));
        assert_eq!(parts[0].data_completa, "10/03/2025");
    }

    #[test]
    fn test_split_starting_inside_break() {
        let parts = split_across_break(&session("13:30", "16:00"));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].ora_inizio, "14:00");
    }

    #[test]
    fn test_schedule_range() {
        assert_eq!(schedule_range(&session("09:00", "18:00")), "09:00 - 13:00 / 14:00 - 18:00");
        assert_eq!(schedule_range(&session("10:00", "13:00")), "10:00 - 13:00");
    }

    #[test]
    fn test_italian_calendar_names() {
        let date = parse_italian_date("10/03/2025").unwrap();
        assert_eq!(italian_weekday_name(date), "lunedì");
        assert_eq!(italian_month_name(3), "marzo");
        assert_eq!(italian_month_name(13), "");
        assert_eq!(format_italian_date("10/03/2025"), "lunedì 10 marzo 2025");
        assert_eq!(format_italian_date("boh"), "boh");
    }

    #[test]
    fn test_sanitize_filename() {
        let name = sanitize_filename("  Corso / Sicurezza: base*?  \"v2\" <a>|  ", "x");
        assert_eq!(name, "Corso_Sicurezza_base_v2_a");
        assert_eq!(sanitize_filename("", "fallback"), "fallback");
        assert_eq!(sanitize_filename(&"a".repeat(300), "x").chars().count(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn test_date_for_filename() {
        assert_eq!(date_for_filename("10/03/2025"), "10-03-2025");
    }

    #[test]
    fn test_calendar_days_group_by_date() {
        let sessions = vec![
            session("09:00", "12:00"),
            session("14:00", "17:00"),
            Sessione {
                data_completa: "11/03/2025".to_string(),
                ..session("09:00", "18:00")
            },
            Sessione {
                data_completa: "12/03/2025".to_string(),
                ..session("10:00", "13:00")
            },
        ];
        let days = calendar_days(&sessions);
        assert_eq!(days.len(), 3);

        assert_eq!(days[0].giorno_settimana, "lunedì");
        assert_eq!(days[0].mattina_label(), "09:00 - 12:00");
        assert_eq!(days[0].pomeriggio_label(), "14:00 - 17:00");
        // span 09:00-17:00 minus the flat hour
        assert_eq!(days[0].ore, 7);

        assert_eq!(days[1].mattina_label(), "09:00 - 13:00");
        assert_eq!(days[1].pomeriggio_label(), "14:00 - 18:00");
        assert_eq!(days[1].ore, 8);

        assert_eq!(days[2].pomeriggio, None);
        assert_eq!(days[2].ore, 3);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
