//! Board and column repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create a board with its columns (and optional seed tasks) atomically.
//! - Serve the read-only board snapshot for display.
//!
//! # Invariants
//! - Snapshot reads never open a write transaction.
//! - Columns are ordered `position ASC`, tasks `position ASC, id ASC`.

use crate::model::board::{
    Board, BoardSeed, BoardSnapshot, Column, ColumnSnapshot, TaskSnapshot,
};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Repository interface for board-level reads and initialization.
pub trait BoardRepository {
    /// Returns the earliest created board, if any.
    fn first_board(&self) -> RepoResult<Option<Board>>;
    fn list_columns(&self, board_id: &str) -> RepoResult<Vec<Column>>;
    /// Inserts the seed as a new board in one transaction.
    fn create_board(&self, seed: &BoardSeed) -> RepoResult<Board>;
    /// Inserts the seed only when no board exists. Returns the board that is
    /// present afterwards and whether it was created by this call.
    fn create_board_if_absent(&self, seed: &BoardSeed) -> RepoResult<(Board, bool)>;
    /// Loads the earliest board with all columns and tasks.
    fn load_snapshot(&self) -> RepoResult<Option<BoardSnapshot>>;
}

/// SQLite-backed board repository.
pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn first_board(&self) -> RepoResult<Option<Board>> {
        first_board(self.conn)
    }

    fn list_columns(&self, board_id: &str) -> RepoResult<Vec<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, board_id, name, position, created_at, updated_at
             FROM board_columns
             WHERE board_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([board_id])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            columns.push(parse_column_row(row)?);
        }
        Ok(columns)
    }

    fn create_board(&self, seed: &BoardSeed) -> RepoResult<Board> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let board = insert_seed(&tx, seed)?;
        tx.commit()?;
        Ok(board)
    }

    fn create_board_if_absent(&self, seed: &BoardSeed) -> RepoResult<(Board, bool)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(existing) = first_board(&tx)? {
            return Ok((existing, false));
        }
        let board = insert_seed(&tx, seed)?;
        tx.commit()?;
        Ok((board, true))
    }

    fn load_snapshot(&self) -> RepoResult<Option<BoardSnapshot>> {
        let Some(board) = first_board(self.conn)? else {
            return Ok(None);
        };

        let mut columns: Vec<ColumnSnapshot> = self
            .list_columns(&board.id)?
            .into_iter()
            .map(|column| ColumnSnapshot {
                id: column.id,
                name: column.name,
                position: column.position,
                tasks: Vec::new(),
            })
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.column_id, t.title, t.description, t.position
             FROM tasks t
             INNER JOIN board_columns c ON c.id = t.column_id
             WHERE c.board_id = ?1
             ORDER BY c.position ASC, t.position ASC, t.id ASC;",
        )?;
        let mut rows = stmt.query([board.id.as_str()])?;
        while let Some(row) = rows.next()? {
            let column_id: String = row.get("column_id")?;
            let column = columns
                .iter_mut()
                .find(|column| column.id == column_id)
                .ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "task column `{column_id}` missing from board `{}`",
                        board.id
                    ))
                })?;
            column.tasks.push(TaskSnapshot {
                id: row.get("id")?,
                title: row.get("title")?,
                description: row.get("description")?,
                position: row.get("position")?,
            });
        }

        Ok(Some(BoardSnapshot {
            id: board.id,
            name: board.name,
            columns,
        }))
    }
}

fn first_board(conn: &Connection) -> RepoResult<Option<Board>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, updated_at
         FROM boards
         ORDER BY created_at ASC, id ASC
         LIMIT 1;",
    )?;
    let mut rows = stmt.query([])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(Board {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }));
    }
    Ok(None)
}

fn insert_seed(conn: &Connection, seed: &BoardSeed) -> RepoResult<Board> {
    let board_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO boards (id, name) VALUES (?1, ?2);",
        params![board_id, seed.name],
    )?;

    for (column_position, column) in seed.columns.iter().enumerate() {
        let column_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO board_columns (id, board_id, name, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![column_id, board_id, column.name, column_position as i64],
        )?;

        for (task_position, (title, description)) in column.tasks.iter().enumerate() {
            conn.execute(
                "INSERT INTO tasks (id, column_id, title, description, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    Uuid::new_v4().to_string(),
                    column_id,
                    title,
                    description,
                    task_position as i64
                ],
            )?;
        }
    }

    load_board(conn, &board_id)
}

fn load_board(conn: &Connection, board_id: &str) -> RepoResult<Board> {
    conn.query_row(
        "SELECT id, name, created_at, updated_at FROM boards WHERE id = ?1;",
        [board_id],
        |row| {
            Ok(Board {
                id: row.get("id")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            })
        },
    )
    .map_err(RepoError::from)
}

fn parse_column_row(row: &Row<'_>) -> RepoResult<Column> {
    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative position `{position}` in board_columns.position"
        )));
    }
    Ok(Column {
        id: row.get("id")?,
        board_id: row.get("board_id")?,
        name: row.get("name")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
