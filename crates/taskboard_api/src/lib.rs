//! Request-level API over the board core.
//!
//! # Responsibility
//! - Expose one call per use case: seed, read, create, update, delete, move
//!   and compact.
//! - Open a store connection per call and wrap results in a serializable
//!   envelope.
//!
//! # Invariants
//! - Calls never panic; every failure becomes `ok=false` with an error kind.
//! - Task titles and descriptions never appear in log lines.

mod session;

pub use session::{BoardSession, BoardTransport, SessionError};

use log::error;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use taskboard_core::db::open_db_with_options;
use taskboard_core::{
    BoardConfig, BoardService, BoardSnapshot, ConfigError, ErrorKind, MoveIntent, RepoError,
    ServiceError, ServiceResult, SqliteBoardRepository, SqliteTaskRepository, Task, TaskPatch,
    TaskService,
};

/// Error part of an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Response envelope returned by every [`BoardApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    /// Human-readable result for diagnostics and UI.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    fn failure(operation: &str, err: &ServiceError) -> Self {
        let message = format!("{operation} failed: {err}");
        Self {
            ok: false,
            message: message.clone(),
            data: None,
            error: Some(ApiError {
                kind: err.kind(),
                message,
            }),
        }
    }

    fn from_result(operation: &str, success: &str, result: ServiceResult<T>) -> Self {
        match result {
            Ok(data) => Self::success(success, data),
            Err(err) => Self::failure(operation, &err),
        }
    }

    /// Error kind of a failed response.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|error| error.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub column_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Board API bound to one configuration.
#[derive(Debug, Clone)]
pub struct BoardApi {
    config: BoardConfig,
}

impl BoardApi {
    pub fn new(config: BoardConfig) -> Self {
        Self { config }
    }

    /// Builds the API from defaults plus `TASKBOARD_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(BoardConfig::load(None)?))
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Writes the sample board when the store is empty.
    pub fn seed(&self) -> ApiResponse<BoardSnapshot> {
        let result = self.with_board_service(|service| service.seed_default_board());
        ApiResponse::from_result("seed", "Board ready.", result)
    }

    pub fn get_board(&self) -> ApiResponse<BoardSnapshot> {
        let result = self.with_board_service(|service| service.get_board());
        ApiResponse::from_result("get_board", "Board loaded.", result)
    }

    pub fn create(&self, request: &CreateTaskRequest) -> ApiResponse<Task> {
        let result = self.with_task_service(|service| {
            service.create_task(
                &request.column_id,
                &request.title,
                request.description.as_deref(),
            )
        });
        ApiResponse::from_result("create", "Task created.", result)
    }

    pub fn update(&self, request: &UpdateTaskRequest) -> ApiResponse<Task> {
        let patch = TaskPatch {
            title: request.title.clone(),
            description: request.description.clone(),
        };
        let result = self.with_task_service(|service| service.update_task(&request.task_id, &patch));
        ApiResponse::from_result("update", "Task updated.", result)
    }

    /// Deletes a task and returns the removed row.
    pub fn delete(&self, task_id: &str) -> ApiResponse<Task> {
        let result = self.with_task_service(|service| service.delete_task(task_id));
        ApiResponse::from_result("delete", "Task deleted.", result)
    }

    /// Persists a drag-and-drop relocation and returns the moved task.
    pub fn move_task(&self, intent: &MoveIntent) -> ApiResponse<Task> {
        let result =
            self.with_task_service(|service| service.move_task(intent).map(|outcome| outcome.task));
        ApiResponse::from_result("move", "Task moved.", result)
    }

    /// Renumbers a column and returns the number of rewritten rows.
    pub fn compact_column(&self, column_id: &str) -> ApiResponse<usize> {
        let result = self.with_task_service(|service| service.compact_column(column_id));
        ApiResponse::from_result("compact", "Column compacted.", result)
    }

    fn with_task_service<T>(
        &self,
        f: impl FnOnce(&TaskService<SqliteTaskRepository<'_>>) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let conn = self.open()?;
        let repo = SqliteTaskRepository::try_new(&conn)?;
        let service = TaskService::with_options(repo, self.config.service_options());
        f(&service)
    }

    fn with_board_service<T>(
        &self,
        f: impl FnOnce(&BoardService<SqliteBoardRepository<'_>>) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let conn = self.open()?;
        let repo = SqliteBoardRepository::try_new(&conn)?;
        f(&BoardService::new(repo))
    }

    fn open(&self) -> Result<Connection, RepoError> {
        open_db_with_options(&self.config.db_path, self.config.db_options()).map_err(|err| {
            error!(
                "event=api_open module=api status=error db_path={} error={err}",
                self.config.db_path.display()
            );
            RepoError::from(err)
        })
    }
}
