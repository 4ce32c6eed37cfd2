//! Order store contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the storage contracts the services are written against.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - `(column_id, position)` is unique in storage at every statement
//!   boundary, not only at rest.
//! - Multi-row writes run inside `TaskRepository::atomic`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::TaskId;
use rusqlite::Connection;
use thiserror::Error;

pub mod board_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from order store operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// Connection schema is not at the expected migrated version.
    #[error("board store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("board store requires table `{0}`")]
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    #[error("invalid persisted board data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["boards", "board_columns", "tasks"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
