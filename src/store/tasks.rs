//! Tasks, their activity log, and column position allocation.
//!
//! A task and its `created` activity are written in one transaction. The
//! position inside a board column comes from a [`PositionAllocator`] that is
//! called inside that same transaction.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use super::{new_id, StoreError};
use crate::config::PositionPolicy;

/// Activity action recorded for new tasks.
pub const ACTIVITY_CREATED: &str = "created";

/// Activity source recorded for classifier-created tasks.
pub const ACTIVITY_SOURCE: &str = "AI Classification";

// ---------------------------------------------------------------------------
// Position allocation
// ---------------------------------------------------------------------------

/// Assigns the next position in a board column.
#[async_trait::async_trait]
pub trait PositionAllocator: Send + Sync {
    /// Next position for `(board_id, status)`, inside the caller's transaction.
    async fn next_position(
        &self,
        conn: &mut SqliteConnection,
        board_id: &str,
        status: &str,
    ) -> Result<i64, StoreError>;

    /// Policy name for logs.
    fn name(&self) -> &'static str;
}

/// Reads the current maximum and returns one more.
///
/// The read takes only a shared lock. When another transaction commits into
/// the same database between the read and the insert, SQLite refuses the
/// lock upgrade with `SQLITE_BUSY` and the creation fails with
/// [`StoreError::Database`] instead of writing a duplicate position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPlusOneAllocator;

#[async_trait::async_trait]
impl PositionAllocator for MaxPlusOneAllocator {
    async fn next_position(
        &self,
        conn: &mut SqliteConnection,
        board_id: &str,
        status: &str,
    ) -> Result<i64, StoreError> {
        let (position,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE board_id = ?1 AND status = ?2",
        )
        .bind(board_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;
        Ok(position)
    }

    fn name(&self) -> &'static str {
        "max_plus_one"
    }
}

/// Per-column sequence row bumped with a single atomic upsert.
///
/// The row is seeded from the column's current maximum, so tasks written
/// before the sequence existed are respected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnSequenceAllocator;

#[async_trait::async_trait]
impl PositionAllocator for ColumnSequenceAllocator {
    async fn next_position(
        &self,
        conn: &mut SqliteConnection,
        board_id: &str,
        status: &str,
    ) -> Result<i64, StoreError> {
        let (position,): (i64,) = sqlx::query_as(
            "INSERT INTO task_position_sequences (board_id, status, last_position) \
             VALUES (?1, ?2, \
                 (SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE board_id = ?1 AND status = ?2)) \
             ON CONFLICT(board_id, status) DO UPDATE SET \
                 last_position = MAX(task_position_sequences.last_position + 1, excluded.last_position) \
             RETURNING last_position",
        )
        .bind(board_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;
        Ok(position)
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

/// Allocator implementing `policy`.
pub fn allocator_for(policy: PositionPolicy) -> Arc<dyn PositionAllocator> {
    match policy {
        PositionPolicy::Sequence => Arc::new(ColumnSequenceAllocator),
        PositionPolicy::MaxPlusOne => Arc::new(MaxPlusOneAllocator),
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Task to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Destination board.
    pub board_id: String,
    /// Creating user.
    pub created_by: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Column / status.
    pub status: String,
    /// Priority.
    pub priority: String,
    /// Labels.
    pub labels: Vec<String>,
    /// Resolved due date.
    pub due_date: Option<NaiveDate>,
    /// Classifier confidence.
    pub ai_confidence: f64,
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id.
    pub id: String,
    /// Board.
    pub board_id: String,
    /// Creating user.
    pub created_by: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Column / status.
    pub status: String,
    /// Priority.
    pub priority: String,
    /// Position within the column.
    pub position: i64,
    /// Labels.
    pub labels: Vec<String>,
    /// Due date (`YYYY-MM-DD`).
    pub due_date: Option<String>,
    /// Classifier confidence.
    pub ai_confidence: f64,
}

/// One activity-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity id.
    pub id: String,
    /// Task the entry belongs to.
    pub task_id: String,
    /// Acting user.
    pub user_id: String,
    /// Action (`created`).
    pub action: String,
    /// Origin of the change.
    pub source: String,
}

/// Insert `task` plus its `created` activity in one transaction.
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is committed then.
pub async fn create_task(
    pool: &SqlitePool,
    allocator: &dyn PositionAllocator,
    task: &NewTask,
) -> Result<Task, StoreError> {
    let mut tx = pool.begin().await?;

    let position = allocator
        .next_position(&mut *tx, &task.board_id, &task.status)
        .await?;
    let id = new_id();
    let labels = serde_json::to_string(&task.labels)?;
    let due_date = task.due_date.map(|d| d.format("%Y-%m-%d").to_string());

    sqlx::query(
        "INSERT INTO tasks \
         (id, board_id, created_by, title, description, status, priority, position, labels, \
          due_date, ai_confidence) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )
    .bind(&id)
    .bind(&task.board_id)
    .bind(&task.created_by)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.status)
    .bind(&task.priority)
    .bind(position)
    .bind(&labels)
    .bind(&due_date)
    .bind(task.ai_confidence)
    .execute(&mut *tx)
    .await?;

    let details = serde_json::json!({ "title": task.title, "position": position }).to_string();
    sqlx::query(
        "INSERT INTO activities (id, task_id, user_id, action, source, details) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(new_id())
    .bind(&id)
    .bind(&task.created_by)
    .bind(ACTIVITY_CREATED)
    .bind(ACTIVITY_SOURCE)
    .bind(&details)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(
        task_id = %id,
        board_id = %task.board_id,
        position,
        allocator = allocator.name(),
        "task created"
    );
    Ok(Task {
        id,
        board_id: task.board_id.clone(),
        created_by: task.created_by.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status.clone(),
        priority: task.priority.clone(),
        position,
        labels: task.labels.clone(),
        due_date,
        ai_confidence: task.ai_confidence,
    })
}

/// Activity entries for `task_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn activities_for_task(pool: &SqlitePool, task_id: &str) -> Result<Vec<Activity>, StoreError> {
    let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, task_id, user_id, action, source FROM activities \
         WHERE task_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, task_id, user_id, action, source)| Activity {
            id,
            task_id,
            user_id,
            action,
            source,
        })
        .collect())
}

/// Positions in `(board_id, status)`, ascending.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn column_positions(pool: &SqlitePool, board_id: &str, status: &str) -> Result<Vec<i64>, StoreError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT position FROM tasks WHERE board_id = ?1 AND status = ?2 ORDER BY position",
    )
    .bind(board_id)
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}
