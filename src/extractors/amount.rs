//! Tolerant numeric parsing for money fields.
//!
//! Values arrive as model output (`"$1,240.50"`, `"USD 99"`, `12.5`) or as
//! text scraped from invoices, so parsing is deliberately forgiving: strip
//! everything except digits, `.`, `,` and `-`, drop the first `,`, and read
//! the longest leading float.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LEADING_FLOAT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").ok());

static DOLLAR_AMOUNT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\s*(-?[\d,]*\.?\d+)").ok());

/// Parse a loosely formatted amount.
///
/// Returns `None` when nothing numeric remains or the result is not finite.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if let Some(idx) = cleaned.find(',') {
        cleaned.remove(idx);
    }

    let re = LEADING_FLOAT_RE.as_ref()?;
    let prefix = re.find(&cleaned)?.as_str();
    prefix.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Find the first `$`-prefixed amount in free text.
pub fn first_dollar_amount(text: &str) -> Option<f64> {
    let re = DOLLAR_AMOUNT_RE.as_ref()?;
    let caps = re.captures(text)?;
    parse_amount(caps.get(1)?.as_str())
}

/// A numeric field that may arrive as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    /// A JSON number.
    Number(f64),
    /// A string such as `"$1,200.00"`.
    Text(String),
}

impl LooseNumber {
    /// Resolve to a finite float through [`parse_amount`].
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => parse_amount(s),
        }
    }

    /// Strip NUL characters from the textual form.
    pub fn strip_nul(&mut self) {
        if let Self::Text(s) = self {
            crate::normalize::strip_nul_in_place(s);
        }
    }
}

impl From<f64> for LooseNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Resolve an optional loose number.
pub fn loose_value(value: Option<&LooseNumber>) -> Option<f64> {
    value.and_then(LooseNumber::value)
}
