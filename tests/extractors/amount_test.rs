//! Tolerant money parsing.

use sift::extractors::amount::{first_dollar_amount, loose_value, parse_amount, LooseNumber};

#[test]
fn parses_formatted_amounts() {
    assert_eq!(parse_amount("$1,240.50"), Some(1240.5));
    assert_eq!(parse_amount("USD 99"), Some(99.0));
    assert_eq!(parse_amount("-12.5"), Some(-12.5));
    assert_eq!(parse_amount(".75"), Some(0.75));
}

#[test]
fn rejects_non_numeric_text() {
    assert_eq!(parse_amount("n/a"), None);
    assert_eq!(parse_amount(""), None);
}

#[test]
fn finds_first_dollar_amount() {
    assert_eq!(
        first_dollar_amount("Subtotal 10\nAmount Due: $540.00\nTip: $5"),
        Some(540.0)
    );
    assert_eq!(first_dollar_amount("Total $ 1,200"), Some(1200.0));
    assert_eq!(first_dollar_amount("no money here"), None);
}

#[test]
fn loose_numbers_accept_numbers_and_strings() {
    let n: LooseNumber = serde_json::from_str("12.5").expect("number");
    assert_eq!(n.value(), Some(12.5));

    let s: LooseNumber = serde_json::from_str(r#""$3,000.25""#).expect("string");
    assert_eq!(s.value(), Some(3000.25));

    let junk: LooseNumber = serde_json::from_str(r#""TBD""#).expect("string");
    assert_eq!(junk.value(), None);

    assert_eq!(loose_value(None), None);
    assert_eq!(loose_value(Some(&LooseNumber::from(4.0))), Some(4.0));
}
