//! Contact extraction: emails, phones, address blocks, name guesses.

use sift::extractors::contact::{company_candidate, extract_contact_info, name_candidate};

#[test]
fn emails_are_lowercased_and_deduplicated() {
    let info = extract_contact_info("Reach Jane@Acme.com or jane@acme.com, cc ops@acme.io");
    assert_eq!(info.emails, vec!["jane@acme.com", "ops@acme.io"]);
    assert_eq!(info.first_email(), Some("jane@acme.com"));
}

#[test]
fn phones_share_one_format() {
    let info = extract_contact_info(
        "Office (555) 123-4567\nCell 555.123.4567\nFax 5551234567\nAlt 212 555 0199",
    );
    assert_eq!(info.phones, vec!["555-123-4567", "212-555-0199"]);
}

#[test]
fn zip_line_pulls_neighbouring_lines() {
    let text = "Estimate #12\n123 Main St\nSpringfield, IL 62704\nTotal $40.00";
    let info = extract_contact_info(text);
    assert_eq!(info.addresses, vec!["123 Main St, Springfield, IL 62704"]);
}

#[test]
fn long_following_line_is_not_part_of_the_address() {
    let body = "x".repeat(120);
    let text = format!("42 Oak Ave\nPortland, OR 97201\n{body}");
    let info = extract_contact_info(&text);
    assert_eq!(info.addresses, vec!["42 Oak Ave, Portland, OR 97201"]);
}

#[test]
fn name_address_header_block() {
    let text = "Name / Address\nJohn Smith\n42 Oak Ave\nJob Location\nsite office";
    let info = extract_contact_info(text);
    assert_eq!(info.addresses, vec!["John Smith, 42 Oak Ave"]);
    assert_eq!(name_candidate(text).as_deref(), Some("John Smith"));
}

#[test]
fn plain_text_has_no_contact_info() {
    let info = extract_contact_info("Remember to water the plants");
    assert!(info.is_empty());
    assert_eq!(info.first_phone(), None);
    assert_eq!(info.first_address(), None);
}

#[test]
fn name_defaults_to_first_line() {
    assert_eq!(
        name_candidate("\n  Jane Doe \nAcme LLC").as_deref(),
        Some("Jane Doe")
    );
    assert_eq!(name_candidate("   "), None);
}

#[test]
fn company_needs_a_suffix_keyword() {
    let text = "Jane Doe\nAcme LLC\njane@acme.com";
    assert_eq!(company_candidate(text).as_deref(), Some("Acme LLC"));
    assert_eq!(company_candidate("Jane Doe\nCall me"), None);
}

#[test]
fn extraction_is_deterministic() {
    let text = "Bob\nBob's Plumbing Inc\n77 Elm Rd\nAustin, TX 73301\nbob@plumb.co 512-555-0100";
    assert_eq!(extract_contact_info(text), extract_contact_info(text));
}
