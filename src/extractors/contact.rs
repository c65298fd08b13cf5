//! Contact-information extraction from noisy text.
//!
//! Pulls emails, phone numbers, and address blocks out of invoices, business
//! cards, and email signatures. The address rules are a line-window heuristic
//! tuned to one estimate/invoice layout family (a `Name / Address` header
//! followed by the customer block, a ZIP line near the top); multi-column
//! layouts and OCR-mangled line breaks are not handled.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").ok());

static PHONE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}").ok());

static ZIP_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b\d{5}(?:-\d{4})?\b").ok());

static PRECEDING_EXCLUDE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)estimate|sales tax|total").ok());

static FOLLOWING_EXCLUDE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)total|signature").ok());

static NAME_ADDRESS_HEADER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)name\s*/\s*address").ok());

static JOB_LOCATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)job location").ok());

static COMPANY_SUFFIX_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:inc|llc|ltd|company|co|corp|corporation|services|group|solutions|enterprises|construction|plumbing|electric|roofing|supply)\b",
    )
    .ok()
});

/// Lines after a following-line candidate longer than this are treated as
/// body text rather than part of an address block.
const MAX_ADDRESS_LINE_CHARS: usize = 80;

/// Maximum lines taken after a `Name / Address` header.
const MAX_HEADER_BLOCK_LINES: usize = 4;

/// Contact signals found in one piece of content.
///
/// Every collection is deduplicated and keeps first-seen order, so "the
/// first email" is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContactInfo {
    /// Lower-cased email addresses.
    pub emails: Vec<String>,
    /// Phone numbers normalized to `NNN-NNN-NNNN`.
    pub phones: Vec<String>,
    /// Address blocks joined with `", "`.
    pub addresses: Vec<String>,
}

impl ExtractedContactInfo {
    /// First email, if any.
    pub fn first_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    /// First phone, if any.
    pub fn first_phone(&self) -> Option<&str> {
        self.phones.first().map(String::as_str)
    }

    /// First address block, if any.
    pub fn first_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.addresses.is_empty()
    }
}

/// Extract emails, phones, and address blocks from normalized text.
pub fn extract_contact_info(text: &str) -> ExtractedContactInfo {
    ExtractedContactInfo {
        emails: extract_emails(text),
        phones: extract_phones(text),
        addresses: extract_addresses(text),
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

fn extract_emails(text: &str) -> Vec<String> {
    let mut emails = Vec::new();
    let Some(re) = EMAIL_RE.as_ref() else {
        return emails;
    };
    for m in re.find_iter(text) {
        push_unique(&mut emails, m.as_str().to_lowercase());
    }
    emails
}

fn extract_phones(text: &str) -> Vec<String> {
    let mut phones = Vec::new();
    let Some(re) = PHONE_RE.as_ref() else {
        return phones;
    };
    for m in re.find_iter(text) {
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 10 {
            continue;
        }
        let formatted = format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]);
        push_unique(&mut phones, formatted);
    }
    phones
}

/// Split into trimmed, non-empty lines.
fn content_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn extract_addresses(text: &str) -> Vec<String> {
    let lines = content_lines(text);
    let mut addresses = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !is_match(&ZIP_RE, line) {
            continue;
        }

        let mut block: Vec<&str> = Vec::new();
        for prev in &lines[i.saturating_sub(2)..i] {
            if !is_match(&PRECEDING_EXCLUDE_RE, prev) {
                block.push(*prev);
            }
        }
        block.push(*line);
        if let Some(next) = lines.get(i.saturating_add(1)) {
            if !is_match(&FOLLOWING_EXCLUDE_RE, next)
                && next.chars().count() <= MAX_ADDRESS_LINE_CHARS
            {
                block.push(*next);
            }
        }
        push_unique(&mut addresses, block.join(", "));
    }

    for (i, line) in lines.iter().enumerate() {
        if !is_match(&NAME_ADDRESS_HEADER_RE, line) {
            continue;
        }
        let block: Vec<&str> = lines
            .iter()
            .skip(i.saturating_add(1))
            .take(MAX_HEADER_BLOCK_LINES)
            .take_while(|l| !is_match(&JOB_LOCATION_RE, l))
            .copied()
            .collect();
        if !block.is_empty() {
            push_unique(&mut addresses, block.join(", "));
        }
    }

    addresses
}

/// Best guess at a person or business name.
///
/// Prefers the first line after a `Name / Address` header, otherwise the
/// first non-empty line of the content.
pub fn name_candidate(text: &str) -> Option<String> {
    let lines = content_lines(text);
    let after_header = lines
        .iter()
        .position(|line| is_match(&NAME_ADDRESS_HEADER_RE, line))
        .and_then(|idx| lines.get(idx.saturating_add(1)))
        .filter(|line| !is_match(&JOB_LOCATION_RE, line));
    after_header
        .or_else(|| lines.first())
        .map(|line| (*line).to_owned())
}

/// First line that carries a company-suffix keyword (`LLC`, `Inc.`, ...).
pub fn company_candidate(text: &str) -> Option<String> {
    content_lines(text)
        .into_iter()
        .find(|line| is_match(&COMPANY_SUFFIX_RE, line))
        .map(str::to_owned)
}
