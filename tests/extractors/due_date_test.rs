//! Due-date resolution with a fixed reference date (Wednesday 2024-01-10).

use chrono::NaiveDate;

use sift::extractors::due_date::{parse_date_string, resolve_due_date};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today() -> NaiveDate {
    date(2024, 1, 10)
}

fn resolve(text: &str) -> Option<NaiveDate> {
    resolve_due_date(None, text, today())
}

#[test]
fn in_n_days() {
    assert_eq!(resolve("Please finish in 3 days"), Some(date(2024, 1, 13)));
    assert_eq!(resolve("due IN 1 DAY"), Some(date(2024, 1, 11)));
}

#[test]
fn relative_keywords() {
    assert_eq!(resolve("call back tomorrow"), Some(date(2024, 1, 11)));
    assert_eq!(resolve("the day after tomorrow works"), Some(date(2024, 1, 12)));
    assert_eq!(resolve("Today!"), Some(today()));
    assert_eq!(resolve("sometime next week"), Some(date(2024, 1, 17)));
    assert_eq!(resolve("revisit next month"), Some(date(2024, 2, 10)));
}

#[test]
fn next_month_clamps_to_month_end() {
    let jan_31 = date(2024, 1, 31);
    assert_eq!(
        resolve_due_date(None, "next month", jan_31),
        Some(date(2024, 2, 29))
    );
}

#[test]
fn weekday_phrases() {
    assert_eq!(resolve("next monday"), Some(date(2024, 1, 15)));
    assert_eq!(resolve("this wednesday"), Some(date(2024, 1, 10)));
    assert_eq!(resolve("next wednesday"), Some(date(2024, 1, 17)));
    assert_eq!(resolve("this friday"), Some(date(2024, 1, 12)));
}

#[test]
fn absolute_dates_in_text() {
    assert_eq!(resolve("deadline 2024-3-5 firm"), Some(date(2024, 3, 5)));
    assert_eq!(resolve("pay by 02/15/2024"), Some(date(2024, 2, 15)));
    assert_eq!(resolve("pay by 2-15-24"), Some(date(2024, 2, 15)));
    assert_eq!(resolve("due March 3rd"), Some(date(2024, 3, 3)));
    assert_eq!(resolve("due Feb 20, 2025"), Some(date(2025, 2, 20)));
}

#[test]
fn first_matching_rule_wins() {
    // "tomorrow" outranks the embedded ISO date.
    assert_eq!(
        resolve("tomorrow, or at the latest 2024-02-01"),
        Some(date(2024, 1, 11))
    );
}

#[test]
fn model_date_outranks_text() {
    assert_eq!(
        resolve_due_date(Some("2024-02-01"), "do it tomorrow", today()),
        Some(date(2024, 2, 1))
    );
    // Unparseable model date falls through to the text rules.
    assert_eq!(
        resolve_due_date(Some("soonish"), "do it tomorrow", today()),
        Some(date(2024, 1, 11))
    );
}

#[test]
fn invalid_calendar_dates_do_not_resolve() {
    assert_eq!(resolve("on 2024-02-30"), None);
    assert_eq!(resolve("due March 45"), None);
}

#[test]
fn nothing_to_resolve() {
    assert_eq!(resolve("no dates in here"), None);
    assert_eq!(resolve(""), None);
}

#[test]
fn date_strings() {
    assert_eq!(parse_date_string("2024-05-06"), Some(date(2024, 5, 6)));
    assert_eq!(parse_date_string("2024-05-06T17:30:00Z"), Some(date(2024, 5, 6)));
    assert_eq!(parse_date_string("2024-05-06T09:00"), Some(date(2024, 5, 6)));
    assert_eq!(parse_date_string("5/6/2024"), Some(date(2024, 5, 6)));
    assert_eq!(parse_date_string("May 6, 2024"), Some(date(2024, 5, 6)));
    assert_eq!(parse_date_string("  "), None);
    assert_eq!(parse_date_string("next tuesday"), None);
}
