//! Task order store contract and SQLite implementation.
//!
//! # Responsibility
//! - Point lookups, ordered listing and counting of tasks per column.
//! - Atomic multi-row writes with all-or-nothing semantics.
//!
//! # Invariants
//! - Listing is deterministic: `position ASC, id ASC`.
//! - `apply_assignments` never violates `UNIQUE(column_id, position)`
//!   between statements.

use crate::model::task::{NewTask, Task, TaskChanges};
use crate::reorder::Assignment;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    column_id,
    title,
    description,
    position,
    created_at,
    updated_at
FROM tasks";

/// Repository interface for task rows.
pub trait TaskRepository {
    /// Runs `f` in one write transaction. Commits when `f` returns `Ok`,
    /// rolls back otherwise. Must not be nested.
    fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
    fn column_exists(&self, column_id: &str) -> RepoResult<bool>;
    fn get_task(&self, task_id: &str) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, column_id: &str) -> RepoResult<Vec<Task>>;
    fn count_tasks(&self, column_id: &str) -> RepoResult<i64>;
    fn max_position(&self, column_id: &str) -> RepoResult<Option<i64>>;
    fn insert_task(&self, task: &NewTask, position: i64) -> RepoResult<Task>;
    fn update_task(&self, task_id: &str, changes: &TaskChanges) -> RepoResult<Task>;
    fn delete_task(&self, task_id: &str) -> RepoResult<()>;
    /// Writes final `(column, position)` pairs. Callers run this inside
    /// [`TaskRepository::atomic`].
    fn apply_assignments(&self, assignments: &[Assignment]) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        // Immediate: the read-then-renumber sequence must hold the write lock
        // from its first read.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = f(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn column_exists(&self, column_id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM board_columns WHERE id = ?1);",
            [column_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_task(&self, task_id: &str) -> RepoResult<Option<Task>> {
        match load_required_task(self.conn, task_id) {
            Ok(task) => Ok(Some(task)),
            Err(RepoError::TaskNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn list_tasks(&self, column_id: &str) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE column_id = ?1 ORDER BY position ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([column_id])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn count_tasks(&self, column_id: &str) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE column_id = ?1;",
            [column_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn max_position(&self, column_id: &str) -> RepoResult<Option<i64>> {
        let max = self.conn.query_row(
            "SELECT MAX(position) FROM tasks WHERE column_id = ?1;",
            [column_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn insert_task(&self, task: &NewTask, position: i64) -> RepoResult<Task> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO tasks (id, column_id, title, description, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id,
                task.column_id,
                task.title,
                task.description,
                position
            ],
        )?;
        load_required_task(self.conn, &id)
    }

    fn update_task(&self, task_id: &str, changes: &TaskChanges) -> RepoResult<Task> {
        let (description_supplied, description) = match &changes.description {
            Some(value) => (1_i64, value.as_deref()),
            None => (0_i64, None),
        };
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = COALESCE(?2, title),
                 description = CASE WHEN ?3 = 1 THEN ?4 ELSE description END,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                task_id,
                changes.title.as_deref(),
                description_supplied,
                description
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(task_id.to_string()));
        }
        load_required_task(self.conn, task_id)
    }

    fn delete_task(&self, task_id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [task_id])?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }

    fn apply_assignments(&self, assignments: &[Assignment]) -> RepoResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        // Phase 1: park every affected row at a distinct negative position so
        // phase 2 can write final positions in any order.
        for (index, assignment) in assignments.iter().enumerate() {
            let scratch = -(index as i64) - 1;
            let changed = self.conn.execute(
                "UPDATE tasks SET position = ?2 WHERE id = ?1;",
                params![assignment.task_id, scratch],
            )?;
            if changed == 0 {
                return Err(RepoError::TaskNotFound(assignment.task_id.clone()));
            }
        }

        for assignment in assignments {
            self.conn.execute(
                "UPDATE tasks
                 SET column_id = ?2,
                     position = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![assignment.task_id, assignment.column_id, assignment.position],
            )?;
        }

        debug!(
            "event=assignments_applied module=repo status=ok rows={}",
            assignments.len()
        );
        Ok(())
    }
}

pub(crate) fn load_required_task(conn: &Connection, task_id: &str) -> RepoResult<Task> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([task_id])?;
    if let Some(row) = rows.next()? {
        return parse_task_row(row);
    }
    Err(RepoError::TaskNotFound(task_id.to_string()))
}

pub(crate) fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative position `{position}` in tasks.position"
        )));
    }
    Ok(Task {
        id: row.get("id")?,
        column_id: row.get("column_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
