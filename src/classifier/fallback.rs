//! Deterministic keyword classifier.
//!
//! Used whenever the model path fails. Pure: identical input always yields
//! structurally equal output, and non-empty content always yields a task.

use crate::extractors::amount::{first_dollar_amount, LooseNumber};
use crate::extractors::contact::{company_candidate, name_candidate, ExtractedContactInfo};
use crate::extractors::{first_line, truncate_chars};

use super::entity::{ClassifiedEntity, ExpenseEntity, PartyEntity, TaskEntity};

/// Maximum characters of the first line used as a task title.
pub const TITLE_MAX_CHARS: usize = 100;

/// Title used when content has no non-blank line.
const UNTITLED: &str = "Untitled";

/// Category assigned to fallback expenses.
pub const FALLBACK_EXPENSE_CATEGORY: &str = "Uncategorized";

const TASK_CONFIDENCE: f64 = 0.6;
const EXPENSE_CONFIDENCE: f64 = 0.5;
const VENDOR_CONFIDENCE: f64 = 0.6;
const SYNTHESIZED_CONTACT_CONFIDENCE: f64 = 0.45;

/// Classify `content` by keyword presence.
///
/// - `invoice` / `receipt` / `amount`: task + expense
/// - `vendor` / `supplier`: task + vendor
/// - otherwise: task
pub fn fallback_entities(content: &str, info: &ExtractedContactInfo) -> Vec<ClassifiedEntity> {
    let lower = content.to_lowercase();
    let headline = first_line(content);
    let task = ClassifiedEntity::Task(TaskEntity {
        confidence: TASK_CONFIDENCE,
        title: Some(truncate_chars(headline.unwrap_or(UNTITLED), TITLE_MAX_CHARS)),
        description: Some(content.to_owned()),
        ..TaskEntity::default()
    });

    if ["invoice", "receipt", "amount"].iter().any(|k| lower.contains(k)) {
        let expense = ClassifiedEntity::Expense(ExpenseEntity {
            confidence: EXPENSE_CONFIDENCE,
            amount: first_dollar_amount(content).map(LooseNumber::from),
            category: Some(FALLBACK_EXPENSE_CATEGORY.to_owned()),
            description: headline.map(str::to_owned),
            ..ExpenseEntity::default()
        });
        return vec![task, expense];
    }

    if ["vendor", "supplier"].iter().any(|k| lower.contains(k)) {
        let vendor = ClassifiedEntity::Vendor(PartyEntity {
            confidence: VENDOR_CONFIDENCE,
            name: headline.map(str::to_owned),
            company: headline.map(str::to_owned),
            email: info.first_email().map(str::to_owned),
            phone: info.first_phone().map(str::to_owned),
            address: info.first_address().map(str::to_owned),
            ..PartyEntity::default()
        });
        return vec![task, vendor];
    }

    vec![task]
}

/// Append a synthesized contact when no contact or vendor entity exists.
///
/// The contact is built from the name and company candidates of `content`
/// and the first extracted email, phone and address. Returns whether an
/// entity was added.
pub fn ensure_party_entity(
    entities: &mut Vec<ClassifiedEntity>,
    content: &str,
    info: &ExtractedContactInfo,
) -> bool {
    if entities.iter().any(ClassifiedEntity::is_party) {
        return false;
    }
    entities.push(ClassifiedEntity::Contact(PartyEntity {
        confidence: SYNTHESIZED_CONTACT_CONFIDENCE,
        name: name_candidate(content),
        company: company_candidate(content),
        email: info.first_email().map(str::to_owned),
        phone: info.first_phone().map(str::to_owned),
        address: info.first_address().map(str::to_owned),
        ..PartyEntity::default()
    }));
    true
}
