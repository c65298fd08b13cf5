//! Deterministic extractors over normalized text.
//!
//! Extractors output typed fields, never free text, and never call out to a
//! model. They run on every request regardless of which classification path
//! is taken:
//! - [`contact`]:  emails, phone numbers and address blocks
//! - [`due_date`]: natural-language and absolute due dates
//! - [`amount`]:   tolerant numeric parsing for money fields

pub mod amount;
pub mod contact;
pub mod due_date;

/// Return the first non-empty trimmed line of `text`.
pub fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Truncate `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}
