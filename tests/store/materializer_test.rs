//! Materializing classified entities into stored records.

use std::sync::Arc;

use chrono::NaiveDate;

use sift::classifier::entity::{ClassifiedEntity, ExpenseEntity, PartyEntity, TaskEntity};
use sift::extractors::amount::LooseNumber;
use sift::materializer::{MaterializeContext, Materializer};
use sift::store::boards::{create_board, Board};
use sift::store::contacts::count_for_owner;
use sift::store::expenses::ai_metadata;
use sift::store::tasks::{activities_for_task, ColumnSequenceAllocator};

use super::memory_pool;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date")
}

fn ctx<'a>(boards: &'a [Board], content: &'a str) -> MaterializeContext<'a> {
    MaterializeContext {
        owner_id: "u1",
        boards,
        content,
        today: today(),
    }
}

fn task(title: &str, board: Option<&str>) -> ClassifiedEntity {
    ClassifiedEntity::Task(TaskEntity {
        confidence: 0.9,
        title: Some(title.to_owned()),
        board_name: board.map(str::to_owned),
        priority: Some("HIGH".to_owned()),
        ..TaskEntity::default()
    })
}

fn party(name: &str, email: &str) -> PartyEntity {
    PartyEntity {
        confidence: 0.8,
        name: Some(name.to_owned()),
        email: Some(email.to_owned()),
        ..PartyEntity::default()
    }
}

#[tokio::test]
async fn invoice_entities_become_records() {
    let pool = memory_pool().await;
    let ops = create_board(&pool, "u1", "Operations", None).await.expect("board");
    let finance = create_board(&pool, "u1", "Finance", None).await.expect("board");
    let boards = vec![ops, finance.clone()];
    let materializer = Materializer::new(pool.clone(), Arc::new(ColumnSequenceAllocator));

    let entities = vec![
        task("Pay invoice #4471", Some("finance")),
        ClassifiedEntity::Vendor(PartyEntity {
            company: Some("Acme Supply Co".to_owned()),
            ..party("Jane", "ap@acme.com")
        }),
        ClassifiedEntity::Expense(ExpenseEntity {
            confidence: 0.7,
            amount: Some(LooseNumber::Text("$540.00".to_owned())),
            currency: Some("usd".to_owned()),
            vendor_name: Some("Acme Supply Co".to_owned()),
            ..ExpenseEntity::default()
        }),
    ];
    let content = "Invoice #4471\nAcme Supply Co\nAmount Due: $540.00\nDue in 3 days";
    let records = materializer
        .materialize(&ctx(&boards, content), &entities)
        .await
        .expect("materialize");

    let created = records.tasks.first().expect("task");
    assert_eq!(created.board_id, finance.id);
    assert_eq!(created.priority, "high");
    assert_eq!(created.due_date.as_deref(), Some("2024-01-13"));
    let activities = activities_for_task(&pool, &created.id).await.expect("activities");
    assert_eq!(activities.len(), 1);

    let vendor = records.vendors.first().expect("vendor");
    assert_eq!(vendor.name, "Acme Supply Co");
    let contact = records.contacts.first().expect("contact");
    assert!(contact.is_vendor);
    assert_eq!(vendor.contact_id, contact.id);

    let expense = records.expenses.first().expect("expense");
    assert_eq!(expense.amount, 540.0);
    assert_eq!(expense.currency, "USD");
    assert_eq!(expense.date, "2024-01-10");

    let mut conn = pool.acquire().await.expect("connection");
    let blob = ai_metadata(&mut conn, &expense.id)
        .await
        .expect("query")
        .expect("metadata stored");
    assert_eq!(blob["raw"]["type"], "expense");
    assert_eq!(blob["total"], 540.0);
}

#[tokio::test]
async fn tasks_are_skipped_without_boards() {
    let pool = memory_pool().await;
    let materializer = Materializer::new(pool.clone(), Arc::new(ColumnSequenceAllocator));

    let records = materializer
        .materialize(&ctx(&[], "Call Bob"), &[task("Call Bob", None)])
        .await
        .expect("materialize");
    assert!(records.tasks.is_empty());
}

#[tokio::test]
async fn unknown_board_name_uses_first_board() {
    let pool = memory_pool().await;
    let first = create_board(&pool, "u1", "Inbox", None).await.expect("board");
    let boards = vec![first.clone()];
    let materializer = Materializer::new(pool.clone(), Arc::new(ColumnSequenceAllocator));

    let records = materializer
        .materialize(&ctx(&boards, "x"), &[task("x", Some("Nope"))])
        .await
        .expect("materialize");
    assert_eq!(records.tasks.first().map(|t| t.board_id.as_str()), Some(first.id.as_str()));
}

#[tokio::test]
async fn repeated_email_resolves_to_one_contact() {
    let pool = memory_pool().await;
    let materializer = Materializer::new(pool.clone(), Arc::new(ColumnSequenceAllocator));

    let entities = vec![
        ClassifiedEntity::Contact(party("Jane Doe", "Jane@Acme.com")),
        ClassifiedEntity::Vendor(party("Jane Doe", "jane@acme.com")),
    ];
    let first = materializer
        .materialize(&ctx(&[], "card"), &entities)
        .await
        .expect("materialize");
    let second = materializer
        .materialize(&ctx(&[], "card"), &entities)
        .await
        .expect("materialize again");

    let ids: Vec<&str> = first
        .contacts
        .iter()
        .chain(second.contacts.iter())
        .map(|c| c.id.as_str())
        .collect();
    assert!(ids.windows(2).all(|w| w.first() == w.last()));
    assert_eq!(first.vendors.first().map(|v| &v.id), second.vendors.first().map(|v| &v.id));

    let mut conn = pool.acquire().await.expect("connection");
    assert_eq!(count_for_owner(&mut conn, "u1").await.expect("count"), 1);
}

#[tokio::test]
async fn contact_without_name_uses_company() {
    let pool = memory_pool().await;
    let materializer = Materializer::new(pool.clone(), Arc::new(ColumnSequenceAllocator));
    let entity = ClassifiedEntity::Contact(PartyEntity {
        company: Some("Bolt Co".to_owned()),
        ..PartyEntity::default()
    });

    let records = materializer
        .materialize(&ctx(&[], "Bolt Co"), &[entity])
        .await
        .expect("materialize");
    assert_eq!(records.contacts.first().map(|c| c.name.as_str()), Some("Bolt Co"));
}
