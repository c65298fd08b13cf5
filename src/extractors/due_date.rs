//! Natural-language due-date resolution.
//!
//! Rules are evaluated in strict priority order and the first matching rule
//! wins; later rules are never consulted. "Today" is always injected so the
//! resolver is a pure function.
//!
//! Priority:
//! 1. model-proposed date that parses to a calendar date
//! 2. `day after tomorrow`  3. `tomorrow`  4. `today`
//! 5. `in N days`  6. `next week`  7. `next month`
//! 8. `next|this <weekday>`
//! 9. ISO `YYYY-M-D`  10. `M/D/YY(YY)` or `M-D-YY(YY)`
//! 11. `<Month> D[, YYYY]`
//! 12. nothing

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;

static IN_DAYS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"in\s+(\d+)\s+days?").ok());

static WEEKDAY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(next|this)\s+(sunday|monday|tuesday|wednesday|thursday|friday|saturday)").ok()
});

static ISO_DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").ok());

static SHORT_DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})").ok());

static MONTH_DAY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s*(\d{4}))?",
    )
    .ok()
});

/// Resolve a due date.
///
/// `ai_date` is the model-proposed value (rule 1); `text` is the content or
/// description scanned by the deterministic rules. The result is a date with
/// no time-of-day component.
pub fn resolve_due_date(ai_date: Option<&str>, text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = ai_date.and_then(parse_date_string) {
        return Some(date);
    }

    let lower = text.to_lowercase();

    if lower.contains("day after tomorrow") {
        return today.checked_add_days(Days::new(2));
    }
    if lower.contains("tomorrow") {
        return today.checked_add_days(Days::new(1));
    }
    if lower.contains("today") {
        return Some(today);
    }
    if let Some(n) = captures(&IN_DAYS_RE, &lower).and_then(|c| c.first().copied().flatten()) {
        let days: u64 = n.parse().ok()?;
        return today.checked_add_days(Days::new(days));
    }
    if lower.contains("next week") {
        return today.checked_add_days(Days::new(7));
    }
    if lower.contains("next month") {
        return today.checked_add_months(Months::new(1));
    }
    if let Some(date) = weekday_phrase(&lower, today) {
        return Some(date);
    }
    if let Some(date) = iso_in_text(&lower) {
        return Some(date);
    }
    if let Some(date) = short_date_in_text(&lower) {
        return Some(date);
    }
    month_day_in_text(&lower, today)
}

/// Parse a standalone date string such as a model-proposed `dueDate`.
///
/// Accepts `YYYY-MM-DD`, RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, `M/D/YYYY`, and
/// `Month D, YYYY`. The calendar date is taken as written.
pub fn parse_date_string(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// Capture groups 1.. of the first match, as borrowed strings.
fn captures<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Vec<Option<&'t str>>> {
    let caps = re.as_ref()?.captures(text)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str()))
            .collect(),
    )
}

fn weekday_phrase(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = captures(&WEEKDAY_RE, lower)?;
    let qualifier = caps.first().copied().flatten()?;
    let target: Weekday = caps.get(1).copied().flatten()?.parse().ok()?;

    let current = today.weekday().num_days_from_sunday();
    let wanted = target.num_days_from_sunday();
    let mut offset = wanted.checked_add(7)?.checked_sub(current)?.checked_rem(7)?;
    if offset == 0 {
        offset = 7;
    }
    if qualifier == "this" && offset == 7 {
        offset = 0;
    }
    today.checked_add_days(Days::new(u64::from(offset)))
}

fn iso_in_text(lower: &str) -> Option<NaiveDate> {
    let caps = captures(&ISO_DATE_RE, lower)?;
    let year: i32 = caps.first().copied().flatten()?.parse().ok()?;
    let month: u32 = caps.get(1).copied().flatten()?.parse().ok()?;
    let day: u32 = caps.get(2).copied().flatten()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn short_date_in_text(lower: &str) -> Option<NaiveDate> {
    let caps = captures(&SHORT_DATE_RE, lower)?;
    let month: u32 = caps.first().copied().flatten()?.parse().ok()?;
    let day: u32 = caps.get(1).copied().flatten()?.parse().ok()?;
    let year_raw = caps.get(2).copied().flatten()?;
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year = year.checked_add(2000)?;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_day_in_text(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = captures(&MONTH_DAY_RE, lower)?;
    let month = month_number(caps.first().copied().flatten()?)?;
    let day: u32 = caps.get(1).copied().flatten()?.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let year = match caps.get(2).copied().flatten() {
        Some(y) => y.parse().ok()?,
        None => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}
