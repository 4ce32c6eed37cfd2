//! Core domain logic for the task board.
//! This crate is the single source of truth for task ordering invariants.

pub mod client;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reorder;
pub mod repo;
pub mod service;

pub use client::{BoardMirror, MirrorError, MoveTicket};
pub use config::{BoardConfig, ConfigError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::board::{
    Board, BoardId, BoardSeed, BoardSnapshot, Column, ColumnId, ColumnSeed, ColumnSnapshot,
    TaskSnapshot,
};
pub use model::task::{
    MoveIntent, NewTask, Task, TaskChanges, TaskId, TaskPatch, ValidationError,
    DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};
pub use reorder::{plan_compaction, plan_move, Assignment, ColumnOrder, MovePlan, ReorderError};
pub use repo::board_repo::{BoardRepository, SqliteBoardRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::board_service::BoardService;
pub use service::task_service::{MoveOutcome, ServiceOptions, TaskService};
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
