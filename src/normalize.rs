//! Content normalization.
//!
//! NUL characters are removed from every piece of text before it is logged,
//! sent to an external API, or persisted. Text-indexed stores reject or
//! corrupt on embedded NUL bytes.

/// Normalize raw request content into canonical text.
///
/// `None` yields an empty string. The function is total and idempotent.
pub fn normalize_content(raw: Option<&str>) -> String {
    raw.map(strip_nul).unwrap_or_default()
}

/// Remove every `\u{0000}` from `text`.
pub fn strip_nul(text: &str) -> String {
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text.to_owned()
    }
}

/// Strip NUL characters from a string in place.
pub fn strip_nul_in_place(text: &mut String) {
    if text.contains('\0') {
        text.retain(|c| c != '\0');
    }
}

/// Strip NUL characters from an optional string in place.
pub fn strip_nul_opt(text: &mut Option<String>) {
    if let Some(value) = text.as_mut() {
        strip_nul_in_place(value);
    }
}
