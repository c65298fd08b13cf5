//! Classified entity types.
//!
//! A [`ClassifiedEntity`] is produced either by the model or by the
//! deterministic fallback; downstream code cannot tell the two apart. The
//! wire form is a JSON object discriminated by `type`, with camelCase fields.
//! Field decoding is tolerant of model output: strings may arrive as
//! numbers, labels as a comma-separated string, confidence as a string.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::extractors::amount::LooseNumber;
use crate::normalize::{strip_nul_in_place, strip_nul_opt};

/// Confidence assigned when the model omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Discriminant of a [`ClassifiedEntity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Actionable work item.
    Task,
    /// Business supplying goods or services.
    Vendor,
    /// Person or organization to keep in the address book.
    Contact,
    /// Money spent.
    Expense,
}

impl EntityType {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Vendor => "vendor",
            Self::Contact => "contact",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed, confidence-scored record to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClassifiedEntity {
    /// A task for one of the caller's boards.
    Task(TaskEntity),
    /// A vendor; materializes as a contact plus its vendor record.
    Vendor(PartyEntity),
    /// A plain contact.
    Contact(PartyEntity),
    /// An expense.
    Expense(ExpenseEntity),
}

/// Task fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskEntity {
    /// Classifier confidence in `[0, 1]`.
    #[serde(default = "default_confidence", deserialize_with = "de_confidence")]
    pub confidence: f64,
    /// Short title.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Longer description.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Destination board name proposed by the model.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub board_name: Option<String>,
    /// Priority (`low`, `medium`, `high`, `urgent`).
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Board column / workflow status.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Free-form labels.
    #[serde(deserialize_with = "de_string_list", skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// One-line summary.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Due date as proposed by the model.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Shared fields of contact and vendor entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartyEntity {
    /// Classifier confidence in `[0, 1]`.
    #[serde(default = "default_confidence", deserialize_with = "de_confidence")]
    pub confidence: f64,
    /// Person or business name.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Company name.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Job title.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Postal address.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Notes.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// One-line summary.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// One priced line of an expense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineItem {
    /// What was bought.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Quantity.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<LooseNumber>,
    /// Unit rate.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub rate: Option<LooseNumber>,
    /// Line total.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub total: Option<LooseNumber>,
}

/// Expense fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpenseEntity {
    /// Classifier confidence in `[0, 1]`.
    #[serde(default = "default_confidence", deserialize_with = "de_confidence")]
    pub confidence: f64,
    /// Amount charged.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub amount: Option<LooseNumber>,
    /// ISO currency code.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Expense category.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Description.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Transaction date.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Vendor that was paid.
    #[serde(deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    /// Pre-tax subtotal.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<LooseNumber>,
    /// Tax.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub tax: Option<LooseNumber>,
    /// Grand total.
    #[serde(deserialize_with = "de_loose_number", skip_serializing_if = "Option::is_none")]
    pub total: Option<LooseNumber>,
    /// Priced line items.
    #[serde(deserialize_with = "de_line_items", skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

impl ClassifiedEntity {
    /// The entity discriminant.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Task(_) => EntityType::Task,
            Self::Vendor(_) => EntityType::Vendor,
            Self::Contact(_) => EntityType::Contact,
            Self::Expense(_) => EntityType::Expense,
        }
    }

    /// Classifier confidence.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Task(t) => t.confidence,
            Self::Vendor(p) | Self::Contact(p) => p.confidence,
            Self::Expense(e) => e.confidence,
        }
    }

    /// Whether this is a contact or vendor.
    pub fn is_party(&self) -> bool {
        matches!(self, Self::Vendor(_) | Self::Contact(_))
    }

    /// Remove NUL characters from every string field.
    pub fn strip_nul(&mut self) {
        match self {
            Self::Task(t) => {
                for field in [
                    &mut t.title,
                    &mut t.description,
                    &mut t.board_name,
                    &mut t.priority,
                    &mut t.status,
                    &mut t.summary,
                    &mut t.due_date,
                ] {
                    strip_nul_opt(field);
                }
                t.labels.iter_mut().for_each(strip_nul_in_place);
            }
            Self::Vendor(p) | Self::Contact(p) => {
                for field in [
                    &mut p.name,
                    &mut p.email,
                    &mut p.phone,
                    &mut p.company,
                    &mut p.title,
                    &mut p.address,
                    &mut p.notes,
                    &mut p.summary,
                ] {
                    strip_nul_opt(field);
                }
            }
            Self::Expense(e) => {
                for field in [
                    &mut e.currency,
                    &mut e.category,
                    &mut e.description,
                    &mut e.date,
                    &mut e.vendor_name,
                ] {
                    strip_nul_opt(field);
                }
                for number in [&mut e.amount, &mut e.subtotal, &mut e.tax, &mut e.total]
                    .into_iter()
                    .flatten()
                {
                    number.strip_nul();
                }
                for item in &mut e.line_items {
                    strip_nul_opt(&mut item.description);
                    for number in [&mut item.quantity, &mut item.rate, &mut item.total]
                        .into_iter()
                        .flatten()
                    {
                        number.strip_nul();
                    }
                }
            }
        }
    }

    /// Decode one model-produced JSON value, clamping confidence into `[0, 1]`.
    ///
    /// The `type` tag is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns the serde error for unknown `type` values or malformed fields.
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        if let Some(Value::String(tag)) = value.get_mut("type") {
            *tag = tag.trim().to_lowercase();
        }
        let mut entity: Self = serde_json::from_value(value)?;
        let c = entity.confidence_mut();
        *c = if c.is_finite() { c.clamp(0.0, 1.0) } else { DEFAULT_CONFIDENCE };
        Ok(entity)
    }

    fn confidence_mut(&mut self) -> &mut f64 {
        match self {
            Self::Task(t) => &mut t.confidence,
            Self::Vendor(p) | Self::Contact(p) => &mut p.confidence,
            Self::Expense(e) => &mut e.confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerant field decoders
// ---------------------------------------------------------------------------

fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn de_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_owned())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn de_loose_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<LooseNumber>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(LooseNumber::Number),
        Some(Value::String(s)) => Some(LooseNumber::Text(s)),
        _ => None,
    })
}

/// `null` or a non-array becomes no items; elements that are not line-item
/// objects are skipped.
fn de_line_items<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<LineItem>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn de_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Option::<LooseNumber>::deserialize(d)?;
    Ok(value
        .and_then(|n| n.value())
        .unwrap_or(DEFAULT_CONFIDENCE))
}
