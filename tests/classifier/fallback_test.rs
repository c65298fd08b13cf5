//! Deterministic keyword classifier and the contact post-check.

use sift::classifier::entity::ClassifiedEntity;
use sift::classifier::fallback::{ensure_party_entity, fallback_entities, TITLE_MAX_CHARS};
use sift::extractors::amount::loose_value;
use sift::extractors::contact::extract_contact_info;

fn classify(content: &str) -> Vec<ClassifiedEntity> {
    let info = extract_contact_info(content);
    let mut entities = fallback_entities(content, &info);
    ensure_party_entity(&mut entities, content, &info);
    entities
}

#[test]
fn invoice_yields_task_expense_and_company_contact() {
    let content = "Invoice #4471\nAcme Supply Co\nAmount Due: $540.00\nDue in 3 days";
    let entities = classify(content);
    assert_eq!(entities.len(), 3);

    match entities.first() {
        Some(ClassifiedEntity::Task(task)) => {
            assert_eq!(task.title.as_deref(), Some("Invoice #4471"));
            assert_eq!(task.description.as_deref(), Some(content));
            assert!((task.confidence - 0.6).abs() < f64::EPSILON);
        }
        other => panic!("expected task first, got {other:?}"),
    }
    match entities.get(1) {
        Some(ClassifiedEntity::Expense(expense)) => {
            assert_eq!(loose_value(expense.amount.as_ref()), Some(540.0));
            assert_eq!(expense.category.as_deref(), Some("Uncategorized"));
            assert_eq!(expense.description.as_deref(), Some("Invoice #4471"));
        }
        other => panic!("expected expense second, got {other:?}"),
    }
    match entities.get(2) {
        Some(ClassifiedEntity::Contact(contact)) => {
            assert_eq!(contact.company.as_deref(), Some("Acme Supply Co"));
            assert!((contact.confidence - 0.45).abs() < f64::EPSILON);
        }
        other => panic!("expected synthesized contact third, got {other:?}"),
    }
}

#[test]
fn vendor_keyword_yields_vendor_with_contact_fields() {
    let content = "Jane Doe\nAcme LLC\njane@acme.com\n555-123-4567\nOur new vendor for parts";
    let entities = classify(content);
    assert_eq!(entities.len(), 2);
    match entities.get(1) {
        Some(ClassifiedEntity::Vendor(vendor)) => {
            assert_eq!(vendor.name.as_deref(), Some("Jane Doe"));
            assert_eq!(vendor.email.as_deref(), Some("jane@acme.com"));
            assert_eq!(vendor.phone.as_deref(), Some("555-123-4567"));
        }
        other => panic!("expected vendor, got {other:?}"),
    }
}

#[test]
fn plain_text_gets_task_and_synthesized_contact() {
    let content = "Water the office plants";
    let info = extract_contact_info(content);
    let mut entities = fallback_entities(content, &info);
    assert_eq!(entities.len(), 1);
    assert!(matches!(entities.first(), Some(ClassifiedEntity::Task(_))));

    assert!(ensure_party_entity(&mut entities, content, &info));
    assert_eq!(entities.len(), 2);
    match entities.get(1) {
        Some(ClassifiedEntity::Contact(contact)) => {
            assert_eq!(contact.name.as_deref(), Some("Water the office plants"));
            assert!(contact.company.is_none());
            assert!(contact.email.is_none());
            assert!(contact.phone.is_none());
            assert!(contact.address.is_none());
            assert!((contact.confidence - 0.45).abs() < f64::EPSILON);
        }
        other => panic!("expected synthesized contact, got {other:?}"),
    }
}

#[test]
fn expense_without_dollar_amount_has_no_amount() {
    let entities = classify("receipt for lunch");
    match entities.get(1) {
        Some(ClassifiedEntity::Expense(expense)) => assert!(expense.amount.is_none()),
        other => panic!("expected expense, got {other:?}"),
    }
}

#[test]
fn title_is_truncated() {
    let long = "a".repeat(250);
    let entities = classify(&long);
    match entities.first() {
        Some(ClassifiedEntity::Task(task)) => {
            assert_eq!(
                task.title.as_deref().map(|t| t.chars().count()),
                Some(TITLE_MAX_CHARS)
            );
        }
        other => panic!("expected task, got {other:?}"),
    }
}

#[test]
fn blank_content_gets_untitled_task() {
    let entities = classify("   \n  ");
    match entities.first() {
        Some(ClassifiedEntity::Task(task)) => assert_eq!(task.title.as_deref(), Some("Untitled")),
        other => panic!("expected task, got {other:?}"),
    }
}

#[test]
fn fallback_is_deterministic() {
    let content = "Supplier: Bolt Co\nbolts@bolt.co\nInvoice total $12.00";
    assert_eq!(classify(content), classify(content));
}

#[test]
fn post_check_adds_contact_from_email() {
    let content = "Follow up with Sam\nsam@example.com";
    let entities = classify(content);
    match entities.last() {
        Some(ClassifiedEntity::Contact(contact)) => {
            assert_eq!(contact.name.as_deref(), Some("Follow up with Sam"));
            assert_eq!(contact.email.as_deref(), Some("sam@example.com"));
            assert!(contact.company.is_none());
        }
        other => panic!("expected synthesized contact, got {other:?}"),
    }
}

#[test]
fn post_check_respects_existing_party() {
    let content = "sam@example.com";
    let info = extract_contact_info(content);
    let mut entities = vec![ClassifiedEntity::Contact(Default::default())];
    assert!(!ensure_party_entity(&mut entities, content, &info));
    assert_eq!(entities.len(), 1);
}
