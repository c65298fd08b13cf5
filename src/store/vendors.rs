//! Vendors: at most one per contact.

use serde::Serialize;
use sqlx::SqliteConnection;

use super::contacts::Contact;
use super::{new_id, StoreError};

/// A stored vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    /// Vendor id.
    pub id: String,
    /// Backing contact.
    pub contact_id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Email copied from the contact.
    pub email: Option<String>,
    /// Phone copied from the contact.
    pub phone: Option<String>,
    /// Address copied from the contact.
    pub address: Option<String>,
}

type VendorRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Create or update the single vendor keyed by `contact.id`.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub async fn upsert_vendor(
    conn: &mut SqliteConnection,
    contact: &Contact,
    display_name: &str,
) -> Result<Vendor, StoreError> {
    let row: VendorRow = sqlx::query_as(
        "INSERT INTO vendors (id, contact_id, owner_id, name, email, phone, address) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(contact_id) DO UPDATE SET \
             name = excluded.name, \
             email = COALESCE(excluded.email, vendors.email), \
             phone = COALESCE(excluded.phone, vendors.phone), \
             address = COALESCE(excluded.address, vendors.address), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         RETURNING id, contact_id, owner_id, name, email, phone, address",
    )
    .bind(new_id())
    .bind(&contact.id)
    .bind(&contact.owner_id)
    .bind(display_name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.address)
    .fetch_one(&mut *conn)
    .await?;

    let (id, contact_id, owner_id, name, email, phone, address) = row;
    tracing::debug!(vendor_id = %id, contact_id = %contact_id, "vendor upserted");
    Ok(Vendor {
        id,
        contact_id,
        owner_id,
        name,
        email,
        phone,
        address,
    })
}

/// Number of vendors backed by `contact_id` (0 or 1).
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn count_for_contact(conn: &mut SqliteConnection, contact_id: &str) -> Result<i64, StoreError> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM vendors WHERE contact_id = ?1")
        .bind(contact_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
