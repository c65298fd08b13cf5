//! Parsing model output into entities.

use sift::classifier::entity::{ClassifiedEntity, EntityType, DEFAULT_CONFIDENCE};
use sift::classifier::{parse_entities, ClassifierFailure};
use sift::extractors::amount::loose_value;

#[test]
fn array_inside_prose() {
    let text = "Here is the result:\n```json\n[{\"type\":\"task\",\"title\":\"Fix sink\",\"confidence\":0.8}]\n```";
    let entities = parse_entities(text).expect("entities");
    assert_eq!(entities.len(), 1);
    match entities.first() {
        Some(ClassifiedEntity::Task(task)) => {
            assert_eq!(task.title.as_deref(), Some("Fix sink"));
            assert!((task.confidence - 0.8).abs() < f64::EPSILON);
        }
        other => panic!("expected task, got {other:?}"),
    }
}

#[test]
fn single_object_becomes_one_entity() {
    let entities = parse_entities(r#"{"type":"contact","name":"Ann"}"#).expect("entities");
    assert_eq!(
        entities.iter().map(ClassifiedEntity::entity_type).collect::<Vec<_>>(),
        vec![EntityType::Contact]
    );
}

#[test]
fn unknown_types_are_dropped() {
    let text = r#"[{"type":"meeting","title":"x"},{"type":"vendor","name":"Acme"}]"#;
    let entities = parse_entities(text).expect("entities");
    assert_eq!(entities.len(), 1);
    assert_eq!(
        entities.first().map(ClassifiedEntity::entity_type),
        Some(EntityType::Vendor)
    );
}

#[test]
fn confidence_defaults_and_clamps() {
    let text = r#"[{"type":"task"},{"type":"task","confidence":1.7},{"type":"task","confidence":"0.25"}]"#;
    let confidences: Vec<f64> = parse_entities(text)
        .expect("entities")
        .iter()
        .map(ClassifiedEntity::confidence)
        .collect();
    assert_eq!(confidences, vec![DEFAULT_CONFIDENCE, 1.0, 0.25]);
}

#[test]
fn fields_are_decoded_tolerantly() {
    let text = r#"[
        {"type":"task","labels":"urgent, plumbing ,","dueDate":"2024-02-01"},
        {"type":"expense","amount":"$1,200.50","vendorName":42,"lineItems":[{"description":"Pipe","quantity":"2","rate":5}]}
    ]"#;
    let entities = parse_entities(text).expect("entities");
    match entities.first() {
        Some(ClassifiedEntity::Task(task)) => {
            assert_eq!(task.labels, vec!["urgent", "plumbing"]);
            assert_eq!(task.due_date.as_deref(), Some("2024-02-01"));
        }
        other => panic!("expected task, got {other:?}"),
    }
    match entities.get(1) {
        Some(ClassifiedEntity::Expense(expense)) => {
            assert_eq!(loose_value(expense.amount.as_ref()), Some(1200.5));
            assert_eq!(expense.vendor_name.as_deref(), Some("42"));
            let item = expense.line_items.first().expect("line item");
            assert_eq!(loose_value(item.quantity.as_ref()), Some(2.0));
            assert_eq!(loose_value(item.rate.as_ref()), Some(5.0));
        }
        other => panic!("expected expense, got {other:?}"),
    }
}

#[test]
fn expense_with_null_line_items_is_kept() {
    let text = r#"[
        {"type":"expense","amount":"$12.00","tax":true,"total":{"value":13},"lineItems":null},
        {"type":"expense","amount":3,"lineItems":"two pipes"},
        {"type":"expense","lineItems":[null,"x",{"description":"Pipe","quantity":[1]}]},
        {"type":"task","title":"x","labels":null}
    ]"#;
    let entities = parse_entities(text).expect("entities");
    assert_eq!(
        entities.iter().map(ClassifiedEntity::entity_type).collect::<Vec<_>>(),
        vec![EntityType::Expense, EntityType::Expense, EntityType::Expense, EntityType::Task]
    );
    match entities.first() {
        Some(ClassifiedEntity::Expense(expense)) => {
            assert_eq!(loose_value(expense.amount.as_ref()), Some(12.0));
            assert!(expense.tax.is_none());
            assert!(expense.total.is_none());
            assert!(expense.line_items.is_empty());
        }
        other => panic!("expected expense, got {other:?}"),
    }
    match entities.get(1) {
        Some(ClassifiedEntity::Expense(expense)) => assert!(expense.line_items.is_empty()),
        other => panic!("expected expense, got {other:?}"),
    }
    match entities.get(2) {
        Some(ClassifiedEntity::Expense(expense)) => {
            assert_eq!(expense.line_items.len(), 1);
            let item = expense.line_items.first().expect("line item");
            assert_eq!(item.description.as_deref(), Some("Pipe"));
            assert!(item.quantity.is_none());
        }
        other => panic!("expected expense, got {other:?}"),
    }
}

#[test]
fn type_tag_is_case_insensitive() {
    let text = r#"[{"type":"Task","title":"Fix sink"},{"type":" VENDOR ","name":"Acme"},{"type":"Expense"}]"#;
    let entities = parse_entities(text).expect("entities");
    assert_eq!(
        entities.iter().map(ClassifiedEntity::entity_type).collect::<Vec<_>>(),
        vec![EntityType::Task, EntityType::Vendor, EntityType::Expense]
    );
    let json = serde_json::to_value(&entities).expect("serializes");
    assert_eq!(json[0]["type"], "task");
}

#[test]
fn failures_are_classified() {
    assert!(matches!(parse_entities("I cannot help"), Err(ClassifierFailure::NoJson)));
    assert!(matches!(
        parse_entities(r#"[{"type":"task",}]"#),
        Err(ClassifierFailure::InvalidJson(_))
    ));
    assert!(matches!(parse_entities("[]"), Err(ClassifierFailure::NoEntities)));
    assert!(matches!(
        parse_entities(r#"[{"type":"meeting"}]"#),
        Err(ClassifierFailure::NoEntities)
    ));
}

#[test]
fn entities_serialize_with_type_tag() {
    let entities = parse_entities(r#"[{"type":"vendor","name":"Acme","boardName":"x"}]"#)
        .expect("entities");
    let json = serde_json::to_value(&entities).expect("serializes");
    assert_eq!(json[0]["type"], "vendor");
    assert_eq!(json[0]["name"], "Acme");
}
