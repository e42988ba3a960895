use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::model::Language;

/// Format expected by every date key in the calendar: local-date `YYYY-MM-DD`.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateKeyError {
    #[error("malformed date key {0:?} (expected YYYY-MM-DD)")]
    Malformed(String),
    #[error("month index {0} out of range (expected 0-11)")]
    MonthIndex(u32),
}

/// Canonical string identity for a calendar date. This key, never a full
/// date-time value, is what every map and lookup in the model uses.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Strict inverse of [`date_key`]. External input goes through here before
/// it is allowed anywhere near the model.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, DateKeyError> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|_| DateKeyError::Malformed(key.to_string()))
}

/// Gregorian day count for a (year, zero-based month index) pair.
///
/// Total over `month_index` 0-11, leap-aware; out-of-range indices yield 0
/// rather than panicking, callers validate indices at the parsing seam.
pub fn days_in_month(year: i32, month_index: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month_index + 1, 1) else {
        return 0;
    };
    let (next_year, next_month) = if month_index >= 11 {
        (year + 1, 1)
    } else {
        (year, month_index + 2)
    };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(next) => u32::try_from(next.signed_duration_since(first).num_days()).unwrap_or(0),
        None => 0,
    }
}

/// Weekday of day 1 of the month, 0=Sunday..6=Saturday. Grid consumers use
/// this to compute leading blank cells.
pub fn first_weekday_of_month(year: i32, month_index: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month_index + 1, 1)
        .map(|date| date.weekday().num_days_from_sunday())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Past,
    Today,
    Future,
}

/// Day-granularity comparison against a caller-supplied `today`.
///
/// Callers compute `today` once per render pass (`Local::now().date_naive()`)
/// and reuse it so a whole pass classifies consistently.
pub fn classify_date(date: NaiveDate, today: NaiveDate) -> DayClass {
    match date.cmp(&today) {
        Ordering::Less => DayClass::Past,
        Ordering::Equal => DayClass::Today,
        Ordering::Greater => DayClass::Future,
    }
}

const MONTH_NAMES_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTH_NAMES_HE: [&str; 12] = [
    "ינואר",
    "פברואר",
    "מרץ",
    "אפריל",
    "מאי",
    "יוני",
    "יולי",
    "אוגוסט",
    "ספטמבר",
    "אוקטובר",
    "נובמבר",
    "דצמבר",
];

const WEEKDAY_NAMES_SHORT_EN: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

const WEEKDAY_NAMES_SHORT_HE: [&str; 7] = ["א", "ב", "ג", "ד", "ה", "ו", "ש"];

pub fn month_name(month_index: u32, language: Language) -> Result<&'static str, DateKeyError> {
    let names = match language {
        Language::En => &MONTH_NAMES_EN,
        Language::He => &MONTH_NAMES_HE,
    };
    names
        .get(month_index as usize)
        .copied()
        .ok_or(DateKeyError::MonthIndex(month_index))
}

/// Short weekday names, Sunday first, matching the 0..6 weekday numbering.
pub fn weekday_names_short(language: Language) -> &'static [&'static str; 7] {
    match language {
        Language::En => &WEEKDAY_NAMES_SHORT_EN,
        Language::He => &WEEKDAY_NAMES_SHORT_HE,
    }
}
