//! Turns classified entities into stored records.
//!
//! Entities are processed sequentially, each in its own transaction. There
//! is no request-wide transaction: when a later entity fails, records
//! written for earlier ones stay.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::debug;

use crate::classifier::entity::{ClassifiedEntity, ExpenseEntity, PartyEntity, TaskEntity};
use crate::classifier::fallback::{FALLBACK_EXPENSE_CATEGORY, TITLE_MAX_CHARS};
use crate::extractors::amount::loose_value;
use crate::extractors::due_date::{parse_date_string, resolve_due_date};
use crate::extractors::{first_line, truncate_chars};
use crate::store::boards::{resolve_board, Board};
use crate::store::contacts::{upsert_contact, Contact, ContactFields};
use crate::store::expenses::{insert_expense, Expense, NewExpense};
use crate::store::tasks::{create_task, NewTask, PositionAllocator, Task};
use crate::store::vendors::{upsert_vendor, Vendor};
use crate::store::{non_blank, StoreError};

/// Status for tasks the classifier gave none.
pub const DEFAULT_TASK_STATUS: &str = "todo";

/// Priority for tasks the classifier gave none.
pub const DEFAULT_TASK_PRIORITY: &str = "medium";

/// Currency for expenses the classifier gave none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Vendor name when neither company nor person name is known.
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// Records written for one request, in entity order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializedRecords {
    /// Created tasks.
    pub tasks: Vec<Task>,
    /// Contacts resolved for contact and vendor entities.
    pub contacts: Vec<Contact>,
    /// Upserted vendors.
    pub vendors: Vec<Vendor>,
    /// Created expenses.
    pub expenses: Vec<Expense>,
}

/// Per-request context shared by every entity.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeContext<'a> {
    /// Caller; owner of created records.
    pub owner_id: &'a str,
    /// Caller's boards, oldest first.
    pub boards: &'a [Board],
    /// Normalized request content.
    pub content: &'a str,
    /// Reference date for relative due dates.
    pub today: NaiveDate,
}

/// Writes classified entities to the store.
#[derive(Clone)]
pub struct Materializer {
    pool: SqlitePool,
    allocator: Arc<dyn PositionAllocator>,
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

impl Materializer {
    /// Create a materializer writing to `pool`.
    pub fn new(pool: SqlitePool, allocator: Arc<dyn PositionAllocator>) -> Self {
        Self { pool, allocator }
    }

    /// Materialize `entities` in order.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error; earlier writes are kept.
    pub async fn materialize(
        &self,
        ctx: &MaterializeContext<'_>,
        entities: &[ClassifiedEntity],
    ) -> Result<MaterializedRecords, StoreError> {
        let mut records = MaterializedRecords::default();

        for entity in entities {
            match entity {
                ClassifiedEntity::Contact(party) => {
                    let (contact, _) = self.materialize_party(ctx.owner_id, party, false).await?;
                    records.contacts.push(contact);
                }
                ClassifiedEntity::Vendor(party) => {
                    let (contact, vendor) = self.materialize_party(ctx.owner_id, party, true).await?;
                    records.contacts.push(contact);
                    records.vendors.extend(vendor);
                }
                ClassifiedEntity::Expense(expense) => {
                    let expense = self.materialize_expense(ctx, expense).await?;
                    records.expenses.push(expense);
                }
                ClassifiedEntity::Task(task) => {
                    if let Some(task) = self.materialize_task(ctx, task).await? {
                        records.tasks.push(task);
                    }
                }
            }
        }

        debug!(
            tasks = records.tasks.len(),
            contacts = records.contacts.len(),
            vendors = records.vendors.len(),
            expenses = records.expenses.len(),
            "entities materialized"
        );
        Ok(records)
    }

    async fn materialize_party(
        &self,
        owner_id: &str,
        party: &PartyEntity,
        is_vendor: bool,
    ) -> Result<(Contact, Option<Vendor>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let contact = upsert_contact(&mut *tx, owner_id, &contact_fields(party), is_vendor).await?;
        let vendor = if is_vendor {
            let name = vendor_display_name(party, &contact);
            Some(upsert_vendor(&mut *tx, &contact, &name).await?)
        } else {
            None
        };

        tx.commit().await?;
        Ok((contact, vendor))
    }

    async fn materialize_expense(
        &self,
        ctx: &MaterializeContext<'_>,
        entity: &ExpenseEntity,
    ) -> Result<Expense, StoreError> {
        let expense = build_expense(ctx.owner_id, entity, ctx.today)?;
        let mut conn = self.pool.acquire().await?;
        insert_expense(&mut *conn, &expense).await
    }

    async fn materialize_task(
        &self,
        ctx: &MaterializeContext<'_>,
        entity: &TaskEntity,
    ) -> Result<Option<Task>, StoreError> {
        let Some(board) = resolve_board(ctx.boards, entity.board_name.as_deref()) else {
            debug!(
                board_name = entity.board_name.as_deref().unwrap_or(""),
                "no board for task entity, skipping"
            );
            return Ok(None);
        };

        let task = build_task(ctx, &board.id, entity);
        create_task(&self.pool, self.allocator.as_ref(), &task).await.map(Some)
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Contact attributes carried by a contact or vendor entity.
pub fn contact_fields(party: &PartyEntity) -> ContactFields {
    ContactFields {
        name: non_blank(party.name.as_deref()).or_else(|| non_blank(party.company.as_deref())),
        email: party.email.clone(),
        phone: party.phone.clone(),
        company: party.company.clone(),
        job_title: party.title.clone(),
        address: party.address.clone(),
        notes: party.notes.clone(),
    }
}

/// Vendor name: company, then person name, then the contact's stored company.
pub fn vendor_display_name(party: &PartyEntity, contact: &Contact) -> String {
    non_blank(party.company.as_deref())
        .or_else(|| non_blank(party.name.as_deref()))
        .or_else(|| non_blank(contact.company.as_deref()))
        .unwrap_or_else(|| UNKNOWN_VENDOR.to_owned())
}

/// Expense row for `entity`.
///
/// Amount falls back to total, then subtotal, then 0. Subtotal defaults to
/// the amount; total defaults to subtotal + tax when tax is present, else
/// the amount.
///
/// # Errors
///
/// Returns an error if the entity cannot be encoded for the audit blob.
pub fn build_expense(
    owner_id: &str,
    entity: &ExpenseEntity,
    today: NaiveDate,
) -> Result<NewExpense, StoreError> {
    let parsed_amount = loose_value(entity.amount.as_ref());
    let parsed_subtotal = loose_value(entity.subtotal.as_ref());
    let tax = loose_value(entity.tax.as_ref());
    let parsed_total = loose_value(entity.total.as_ref());

    let amount = parsed_amount
        .or(parsed_total)
        .or(parsed_subtotal)
        .unwrap_or(0.0);
    let subtotal = parsed_subtotal.unwrap_or(amount);
    let total = parsed_total.unwrap_or_else(|| match tax {
        Some(tax) => subtotal + tax,
        None => amount,
    });

    let line_items = serde_json::to_value(&entity.line_items)?;
    let raw = serde_json::to_value(ClassifiedEntity::Expense(entity.clone()))?;
    let ai_metadata = json!({
        "subtotal": subtotal,
        "tax": tax,
        "total": total,
        "lineItems": line_items,
        "raw": raw,
    });

    Ok(NewExpense {
        owner_id: owner_id.to_owned(),
        vendor_name: non_blank(entity.vendor_name.as_deref()),
        amount,
        subtotal: Some(subtotal),
        tax,
        total: Some(total),
        currency: non_blank(entity.currency.as_deref())
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
        category: non_blank(entity.category.as_deref())
            .unwrap_or_else(|| FALLBACK_EXPENSE_CATEGORY.to_owned()),
        description: non_blank(entity.description.as_deref()),
        expense_date: entity
            .date
            .as_deref()
            .and_then(parse_date_string)
            .unwrap_or(today),
        line_items,
        ai_confidence: entity.confidence,
        ai_metadata,
    })
}

/// Task row for `entity` on `board_id`.
pub fn build_task(ctx: &MaterializeContext<'_>, board_id: &str, entity: &TaskEntity) -> NewTask {
    let description = non_blank(entity.description.as_deref());
    let title = non_blank(entity.title.as_deref())
        .or_else(|| description.as_deref().and_then(first_line).map(str::to_owned))
        .or_else(|| first_line(ctx.content).map(str::to_owned))
        .map(|t| truncate_chars(&t, TITLE_MAX_CHARS))
        .unwrap_or_else(|| "Untitled".to_owned());

    let due_text = format!("{}\n{}", description.as_deref().unwrap_or(""), ctx.content);
    let due_date = resolve_due_date(entity.due_date.as_deref(), &due_text, ctx.today);

    NewTask {
        board_id: board_id.to_owned(),
        created_by: ctx.owner_id.to_owned(),
        title,
        description,
        status: non_blank(entity.status.as_deref())
            .unwrap_or_else(|| DEFAULT_TASK_STATUS.to_owned()),
        priority: non_blank(entity.priority.as_deref())
            .map(|p| p.to_lowercase())
            .unwrap_or_else(|| DEFAULT_TASK_PRIORITY.to_owned()),
        labels: entity.labels.clone(),
        due_date,
        ai_confidence: entity.confidence,
    }
}
