//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map store failures into the three-kind error taxonomy callers see.
//!
//! # Invariants
//! - Validation runs before any store I/O.
//! - The task service is the only writer of task rows.

use crate::model::task::{TaskId, ValidationError};
use crate::reorder::ReorderError;
use crate::repo::RepoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod board_service;
pub mod task_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error category exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    StoreUnavailable,
}

/// Errors from service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("board not found")]
    BoardNotFound,
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::BoardNotFound => ErrorKind::NotFound,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Stable snake_case code used in log lines.
    pub(crate) fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StoreUnavailable => "store_unavailable",
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TaskNotFound(task_id) => Self::TaskNotFound(task_id),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<ReorderError> for ServiceError {
    fn from(value: ReorderError) -> Self {
        // The engine only sees lists read inside the same transaction, so a
        // mismatch means the stored rows are inconsistent.
        Self::StoreUnavailable(RepoError::InvalidData(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::model::task::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_into_taxonomy() {
        let not_found: ServiceError = RepoError::TaskNotFound("t".to_string()).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let validation: ServiceError = ValidationError::UnknownColumn("c".to_string()).into();
        assert_eq!(validation.kind(), ErrorKind::Validation);

        let store: ServiceError = RepoError::InvalidData("bad".to_string()).into();
        assert_eq!(store.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let encoded = serde_json::to_string(&ErrorKind::StoreUnavailable).unwrap();
        assert_eq!(encoded, "\"store_unavailable\"");
    }
}
