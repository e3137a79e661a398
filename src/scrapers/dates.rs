//! Publication date normalization.
//!
//! Providers report dates as RFC 3339 timestamps, `dd/mm/yyyy`, a day plus a
//! Portuguese month abbreviation, or relative text such as "há 3 horas" and
//! "yesterday". Everything resolves to a [`NaiveDate`] against the caller's
//! `today`; text that can't be read yields `None`.

use chrono::{DateTime, Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static AGO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(segundos?|minutos?|horas?|dias?|semanas?|seconds?|mins?|minutes?|hours?|days?|weeks?)\b")
        .expect("valid relative date regex")
});

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s+(?:de\s+)?([[:alpha:]]{3,})\.?(?:\s+(?:de\s+)?(\d{4}))?")
        .expect("valid day-month regex")
});

/// Month number for a Portuguese or English month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.trim().to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "fev" | "feb" => 2,
        "mar" => 3,
        "abr" | "apr" => 4,
        "mai" | "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" | "aug" => 8,
        "set" | "sep" => 9,
        "out" | "oct" => 10,
        "nov" => 11,
        "dez" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// `dd/mm/yyyy` (the separator may also be `-` or `.`).
pub fn parse_dmy(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Calendar date of an RFC 3339 timestamp, falling back to a leading `YYYY-MM-DD`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    text.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// A day and month without a year, placed in the most recent year that
/// doesn't put it after `today`.
pub fn day_month_in_past(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year <= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() - 1, month, day)
    }
}

/// Resolve a human-readable date as shown on search result pages.
pub fn parse_human_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if text.contains("ontem") || text.contains("yesterday") {
        return Some(today - Duration::days(1));
    }
    if text.contains("agora") || text.contains("just now") || text.contains("hoje") || text.contains("today") {
        return Some(today);
    }

    if let Some(caps) = AGO.captures(&text) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit = &caps[2];
        let days = if unit.starts_with("dia") || unit.starts_with("day") {
            amount
        } else if unit.starts_with("semana") || unit.starts_with("week") {
            amount * 7
        } else {
            0
        };
        return Some(today - Duration::days(days));
    }

    if let Some(date) = parse_dmy(&text) {
        return Some(date);
    }

    let caps = DAY_MONTH_YEAR.captures(&text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    match caps.get(3) {
        Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
        None => day_month_in_past(day, month, today),
    }
}
