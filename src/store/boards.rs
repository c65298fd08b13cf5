//! Boards and membership.

use serde::Serialize;
use sqlx::SqlitePool;

use super::{new_id, StoreError};

/// A destination for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Board id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

type BoardRow = (String, String, String, Option<String>);

fn from_row((id, owner_id, name, description): BoardRow) -> Board {
    Board {
        id,
        owner_id,
        name,
        description,
    }
}

/// Boards `user_id` owns or is a member of, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn boards_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Board>, StoreError> {
    let rows: Vec<BoardRow> = sqlx::query_as(
        "SELECT b.id, b.owner_id, b.name, b.description FROM boards b \
         WHERE b.owner_id = ?1 \
            OR EXISTS (SELECT 1 FROM board_members m WHERE m.board_id = b.id AND m.user_id = ?1) \
         ORDER BY b.created_at, b.rowid",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(from_row).collect())
}

/// Create a board owned by `owner_id`.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn create_board(
    pool: &SqlitePool,
    owner_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Board, StoreError> {
    let id = new_id();
    sqlx::query("INSERT INTO boards (id, owner_id, name, description) VALUES (?1, ?2, ?3, ?4)")
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    Ok(Board {
        id,
        owner_id: owner_id.to_owned(),
        name: name.to_owned(),
        description: description.map(str::to_owned),
    })
}

/// Grant `user_id` membership of `board_id`.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn add_member(pool: &SqlitePool, board_id: &str, user_id: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT OR IGNORE INTO board_members (board_id, user_id) VALUES (?1, ?2)")
        .bind(board_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Board named `name` (case-insensitive), else the first board.
pub fn resolve_board<'a>(boards: &'a [Board], name: Option<&str>) -> Option<&'a Board> {
    let wanted = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_lowercase);
    wanted
        .and_then(|wanted| {
            boards
                .iter()
                .find(|board| board.name.trim().to_lowercase() == wanted)
        })
        .or_else(|| boards.first())
}
