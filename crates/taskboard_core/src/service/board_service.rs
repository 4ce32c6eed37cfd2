//! Board read and initialization service.
//!
//! # Responsibility
//! - Serve the board snapshot to display collaborators.
//! - Create boards (with optional seed tasks) at initialization.
//!
//! # Invariants
//! - `get_board` is read-only.
//! - Seeding is idempotent: an existing board is never touched.

use crate::model::board::{BoardSeed, BoardSnapshot, Column, ColumnSeed};
use crate::model::task::{normalize_description, normalize_title, ValidationError};
use crate::repo::board_repo::BoardRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use std::time::Instant;

/// Use-case service for board-level reads and initialization.
pub struct BoardService<R: BoardRepository> {
    repo: R,
}

impl<R: BoardRepository> BoardService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the board with ordered columns and tasks.
    pub fn get_board(&self) -> ServiceResult<BoardSnapshot> {
        self.repo
            .load_snapshot()?
            .ok_or(ServiceError::BoardNotFound)
    }

    /// Lists the board's columns ordered by position.
    pub fn list_columns(&self) -> ServiceResult<Vec<Column>> {
        let board = self
            .repo
            .first_board()?
            .ok_or(ServiceError::BoardNotFound)?;
        Ok(self.repo.list_columns(&board.id)?)
    }

    /// Creates a board with empty columns in the given order.
    pub fn create_board(&self, name: &str, column_names: &[&str]) -> ServiceResult<BoardSnapshot> {
        let seed = normalize_seed(&BoardSeed::empty(name, column_names))?;
        let board = self.repo.create_board(&seed)?;
        info!(
            "event=board_create module=service status=ok board_id={} columns={}",
            board.id,
            seed.columns.len()
        );
        self.get_board()
    }

    /// Writes the sample board when the store holds no board yet.
    pub fn seed_default_board(&self) -> ServiceResult<BoardSnapshot> {
        self.seed_board(&BoardSeed::sample())
    }

    /// Writes `seed` when the store holds no board yet, otherwise returns
    /// the existing board unchanged.
    pub fn seed_board(&self, seed: &BoardSeed) -> ServiceResult<BoardSnapshot> {
        let started_at = Instant::now();
        let seed = normalize_seed(seed)?;
        let (board, created) = self.repo.create_board_if_absent(&seed)?;
        info!(
            "event=board_seed module=service status=ok board_id={} created={} duration_ms={}",
            board.id,
            created,
            started_at.elapsed().as_millis()
        );
        self.get_board()
    }
}

fn normalize_seed(seed: &BoardSeed) -> Result<BoardSeed, ValidationError> {
    let name = required_name(&seed.name, "board name")?;
    let columns = seed
        .columns
        .iter()
        .map(|column| {
            let tasks = column
                .tasks
                .iter()
                .map(|(title, description)| {
                    Ok((
                        normalize_title(title)?,
                        normalize_description(description.as_deref())?,
                    ))
                })
                .collect::<Result<Vec<_>, ValidationError>>()?;
            Ok(ColumnSeed {
                name: required_name(&column.name, "column name")?,
                tasks,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;
    Ok(BoardSeed { name, columns })
}

fn required_name(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}
