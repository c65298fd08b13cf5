//! Contacts, deduplicated per owner by lower-cased email.

use serde::Serialize;
use sqlx::SqliteConnection;

use super::{new_id, non_blank, StoreError};

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Person or business name.
    pub name: String,
    /// Lower-cased email.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Set once any vendor entity resolves to this contact.
    pub is_vendor: bool,
}

/// Incoming contact attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    /// Name.
    pub name: Option<String>,
    /// Email (any case).
    pub email: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Address.
    pub address: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

type ContactRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
);

const CONTACT_COLUMNS: &str =
    "id, owner_id, name, email, phone, company, job_title, address, notes, is_vendor";

fn from_row(row: ContactRow) -> Contact {
    let (id, owner_id, name, email, phone, company, job_title, address, notes, is_vendor) = row;
    Contact {
        id,
        owner_id,
        name,
        email,
        phone,
        company,
        job_title,
        address,
        notes,
        is_vendor,
    }
}

/// Find `owner_id`'s contact with `email`, compared case-insensitively.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn find_by_email(
    conn: &mut SqliteConnection,
    owner_id: &str,
    email: &str,
) -> Result<Option<Contact>, StoreError> {
    let sql = format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts \
         WHERE owner_id = ?1 AND lower(email) = lower(?2) LIMIT 1"
    );
    let row: Option<ContactRow> = sqlx::query_as(&sql)
        .bind(owner_id)
        .bind(email.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(from_row))
}

/// Look up by email and merge, or create.
///
/// Merge only fills attributes that are empty on the stored contact;
/// `is_vendor` is OR'd and never cleared. Callers run this inside a
/// transaction so the read-merge-write is atomic.
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn upsert_contact(
    conn: &mut SqliteConnection,
    owner_id: &str,
    fields: &ContactFields,
    is_vendor: bool,
) -> Result<Contact, StoreError> {
    let email = non_blank(fields.email.as_deref()).map(|e| e.to_lowercase());

    let existing = match email.as_deref() {
        Some(email) => find_by_email(&mut *conn, owner_id, email).await?,
        None => None,
    };

    match existing {
        Some(current) => merge_into(conn, current, fields, is_vendor).await,
        None => insert(conn, owner_id, email, fields, is_vendor).await,
    }
}

async fn insert(
    conn: &mut SqliteConnection,
    owner_id: &str,
    email: Option<String>,
    fields: &ContactFields,
    is_vendor: bool,
) -> Result<Contact, StoreError> {
    let contact = Contact {
        id: new_id(),
        owner_id: owner_id.to_owned(),
        name: non_blank(fields.name.as_deref()).unwrap_or_default(),
        email,
        phone: non_blank(fields.phone.as_deref()),
        company: non_blank(fields.company.as_deref()),
        job_title: non_blank(fields.job_title.as_deref()),
        address: non_blank(fields.address.as_deref()),
        notes: non_blank(fields.notes.as_deref()),
        is_vendor,
    };

    sqlx::query(
        "INSERT INTO contacts \
         (id, owner_id, name, email, phone, company, job_title, address, notes, is_vendor) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&contact.id)
    .bind(&contact.owner_id)
    .bind(&contact.name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.company)
    .bind(&contact.job_title)
    .bind(&contact.address)
    .bind(&contact.notes)
    .bind(contact.is_vendor)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(contact_id = %contact.id, "contact created");
    Ok(contact)
}

async fn merge_into(
    conn: &mut SqliteConnection,
    mut contact: Contact,
    fields: &ContactFields,
    is_vendor: bool,
) -> Result<Contact, StoreError> {
    if contact.name.trim().is_empty() {
        if let Some(name) = non_blank(fields.name.as_deref()) {
            contact.name = name;
        }
    }
    fill_empty(&mut contact.phone, fields.phone.as_deref());
    fill_empty(&mut contact.company, fields.company.as_deref());
    fill_empty(&mut contact.job_title, fields.job_title.as_deref());
    fill_empty(&mut contact.address, fields.address.as_deref());
    fill_empty(&mut contact.notes, fields.notes.as_deref());
    contact.is_vendor = contact.is_vendor || is_vendor;

    sqlx::query(
        "UPDATE contacts SET name = ?1, phone = ?2, company = ?3, job_title = ?4, \
         address = ?5, notes = ?6, is_vendor = ?7, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         WHERE id = ?8",
    )
    .bind(&contact.name)
    .bind(&contact.phone)
    .bind(&contact.company)
    .bind(&contact.job_title)
    .bind(&contact.address)
    .bind(&contact.notes)
    .bind(contact.is_vendor)
    .bind(&contact.id)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(contact_id = %contact.id, "contact merged");
    Ok(contact)
}

fn fill_empty(slot: &mut Option<String>, incoming: Option<&str>) {
    let empty = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if empty {
        if let Some(value) = non_blank(incoming) {
            *slot = Some(value);
        }
    }
}

/// Fetch a contact by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn get_contact(conn: &mut SqliteConnection, id: &str) -> Result<Option<Contact>, StoreError> {
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
    let row: Option<ContactRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(from_row))
}

/// Number of contacts owned by `owner_id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn count_for_owner(conn: &mut SqliteConnection, owner_id: &str) -> Result<i64, StoreError> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM contacts WHERE owner_id = ?1")
        .bind(owner_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
