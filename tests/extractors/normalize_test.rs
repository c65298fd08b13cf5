//! Content normalization.

use sift::normalize::normalize_content;

#[test]
fn strips_every_nul() {
    assert_eq!(normalize_content(Some("\0Invoice\0 #1\0")), "Invoice #1");
}

#[test]
fn missing_content_is_empty() {
    assert_eq!(normalize_content(None), "");
}

#[test]
fn normalization_is_idempotent() {
    for raw in ["plain", "a\0b", "\0\0", "", "üñí\0cødé"] {
        let once = normalize_content(Some(raw));
        let twice = normalize_content(Some(&once));
        assert_eq!(once, twice);
        assert!(!once.contains('\0'));
    }
}
