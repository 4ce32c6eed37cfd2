//! Task record, mutation inputs and field validation.
//!
//! # Invariants
//! - Titles are stored trimmed, 1..=200 characters.
//! - Descriptions are at most 1000 characters; empty means absent.
//! - Character limits count Unicode scalar values, not bytes.

use crate::model::board::ColumnId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque task identifier.
pub type TaskId = String;

/// Maximum title length after trimming.
pub const TITLE_MAX_CHARS: usize = 200;
/// Maximum description length.
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Persisted task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
    /// Rank within the owning column.
    pub position: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Input rejected before any store I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,
    #[error("title must be 200 characters or less, got {0}")]
    TitleTooLong(usize),
    #[error("description must be 1000 characters or less, got {0}")]
    DescriptionTooLong(usize),
    #[error("at least one field (title or description) must be provided")]
    EmptyPatch,
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("column not found: {0}")]
    UnknownColumn(ColumnId),
    #[error("task {task_id} is in column {actual}, not {claimed}")]
    SourceColumnMismatch {
        task_id: TaskId,
        claimed: ColumnId,
        actual: ColumnId,
    },
}

/// Validated input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
}

impl NewTask {
    /// Validates and normalizes raw create input.
    pub fn validate(
        column_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            column_id: require_id(column_id, "column_id")?,
            title: normalize_title(title)?,
            description: normalize_description(description)?,
        })
    }
}

/// Partial update as supplied by a caller.
///
/// `description: Some("")` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Normalized update ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    /// Outer `Some` means the field was supplied; inner `None` clears it.
    pub description: Option<Option<String>>,
}

impl TaskPatch {
    /// Validates the patch and normalizes supplied fields.
    pub fn normalize(&self) -> Result<TaskChanges, ValidationError> {
        if self.title.is_none() && self.description.is_none() {
            return Err(ValidationError::EmptyPatch);
        }
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        let description = match self.description.as_deref() {
            Some(value) => Some(normalize_description(Some(value))?),
            None => None,
        };
        Ok(TaskChanges { title, description })
    }
}

/// Relocation request produced by a drag-and-drop gesture.
///
/// `new_index` is the insertion index in the destination list after the
/// moving task has been removed from consideration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub task_id: TaskId,
    pub source_column_id: ColumnId,
    pub destination_column_id: ColumnId,
    #[serde(alias = "newOrder")]
    pub new_index: usize,
}

impl MoveIntent {
    pub fn new(
        task_id: impl Into<TaskId>,
        source_column_id: impl Into<ColumnId>,
        destination_column_id: impl Into<ColumnId>,
        new_index: usize,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            source_column_id: source_column_id.into(),
            destination_column_id: destination_column_id.into(),
            new_index,
        }
    }

    /// Rejects blank identifiers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id(&self.task_id, "task_id")?;
        require_id(&self.source_column_id, "source_column_id")?;
        require_id(&self.destination_column_id, "destination_column_id")?;
        Ok(())
    }

    pub fn is_same_column(&self) -> bool {
        self.source_column_id == self.destination_column_id
    }
}

/// Trims a title and enforces its length window.
pub fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    let length = trimmed.chars().count();
    if length > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong(length));
    }
    Ok(trimmed.to_string())
}

/// Enforces the maximum length on the input as supplied, then trims and maps
/// empty to `None`.
pub fn normalize_description(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let length = raw.chars().count();
    if length > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong(length));
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

/// Returns an owned identifier, rejecting blank input.
pub fn require_id(value: &str, field: &'static str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(value.to_string())
}
