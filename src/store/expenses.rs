//! Expenses. Inserted fresh for every expense entity; never deduplicated.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqliteConnection;

use super::{new_id, StoreError};

/// Expense to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Owning user.
    pub owner_id: String,
    /// Vendor that was paid.
    pub vendor_name: Option<String>,
    /// Amount charged.
    pub amount: f64,
    /// Pre-tax subtotal.
    pub subtotal: Option<f64>,
    /// Tax.
    pub tax: Option<f64>,
    /// Grand total.
    pub total: Option<f64>,
    /// ISO currency code.
    pub currency: String,
    /// Category.
    pub category: String,
    /// Description.
    pub description: Option<String>,
    /// Transaction date.
    pub expense_date: NaiveDate,
    /// Line items as a JSON array.
    pub line_items: Value,
    /// Classifier confidence.
    pub ai_confidence: f64,
    /// Audit blob: `{subtotal, tax, total, lineItems, raw}`.
    pub ai_metadata: Value,
}

/// A stored expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Expense id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Vendor that was paid.
    pub vendor_name: Option<String>,
    /// Amount charged.
    pub amount: f64,
    /// Pre-tax subtotal.
    pub subtotal: Option<f64>,
    /// Tax.
    pub tax: Option<f64>,
    /// Grand total.
    pub total: Option<f64>,
    /// ISO currency code.
    pub currency: String,
    /// Category.
    pub category: String,
    /// Description.
    pub description: Option<String>,
    /// Transaction date (`YYYY-MM-DD`).
    pub date: String,
    /// Line items.
    pub line_items: Value,
    /// Classifier confidence.
    pub ai_confidence: f64,
}

/// Insert `expense`.
///
/// # Errors
///
/// Returns an error if JSON encoding or the insert fails.
pub async fn insert_expense(conn: &mut SqliteConnection, expense: &NewExpense) -> Result<Expense, StoreError> {
    let id = new_id();
    let date = expense.expense_date.format("%Y-%m-%d").to_string();
    let line_items = serde_json::to_string(&expense.line_items)?;
    let metadata = serde_json::to_string(&expense.ai_metadata)?;

    sqlx::query(
        "INSERT INTO expenses \
         (id, owner_id, vendor_name, amount, subtotal, tax, total, currency, category, \
          description, expense_date, line_items, ai_confidence, ai_metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(&id)
    .bind(&expense.owner_id)
    .bind(&expense.vendor_name)
    .bind(expense.amount)
    .bind(expense.subtotal)
    .bind(expense.tax)
    .bind(expense.total)
    .bind(&expense.currency)
    .bind(&expense.category)
    .bind(&expense.description)
    .bind(&date)
    .bind(&line_items)
    .bind(expense.ai_confidence)
    .bind(&metadata)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(expense_id = %id, amount = expense.amount, "expense created");
    Ok(Expense {
        id,
        owner_id: expense.owner_id.clone(),
        vendor_name: expense.vendor_name.clone(),
        amount: expense.amount,
        subtotal: expense.subtotal,
        tax: expense.tax,
        total: expense.total,
        currency: expense.currency.clone(),
        category: expense.category.clone(),
        description: expense.description.clone(),
        date,
        line_items: expense.line_items.clone(),
        ai_confidence: expense.ai_confidence,
    })
}

/// Stored audit blob of expense `id`.
///
/// # Errors
///
/// Returns an error if the query or JSON decoding fails.
pub async fn ai_metadata(conn: &mut SqliteConnection, id: &str) -> Result<Option<Value>, StoreError> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT ai_metadata FROM expenses WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row.and_then(|(blob,)| blob) {
        Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
        None => Ok(None),
    }
}
