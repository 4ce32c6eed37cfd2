//! Task mutation service.
//!
//! # Responsibility
//! - Sole write path for task rows: create, update, delete, move, compact.
//! - Wrap every multi-row change in one store transaction.
//!
//! # Invariants
//! - Field validation completes before a transaction is opened.
//! - A move persists the engine's whole plan or nothing.
//! - A no-op move performs zero row writes.

use crate::model::task::{require_id, MoveIntent, NewTask, Task, TaskPatch, ValidationError};
use crate::reorder::{plan_compaction, plan_move, ColumnOrder};
use crate::repo::task_repo::TaskRepository;
use crate::service::{ServiceError, ServiceResult};
use log::{error, info, warn};
use std::time::Instant;

/// Behavior switches for [`TaskService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Renumber the column inside the delete transaction.
    pub compact_on_delete: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            compact_on_delete: true,
        }
    }
}

/// Outcome of a move, with the number of rows rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub task: Task,
    pub rows_written: usize,
}

/// Use-case service for task mutations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    options: ServiceOptions,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service with default options.
    pub fn new(repo: R) -> Self {
        Self::with_options(repo, ServiceOptions::default())
    }

    pub fn with_options(repo: R, options: ServiceOptions) -> Self {
        Self { repo, options }
    }

    /// Appends a task to the end of `column_id`.
    ///
    /// # Contract
    /// - Position is the column's task count before the insert.
    /// - Unknown column fails with `ValidationError::UnknownColumn`.
    pub fn create_task(
        &self,
        column_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let draft = NewTask::validate(column_id, title, description)
            .inspect_err(|err| log_rejected("task_create", err))?;

        let result = self.repo.atomic(|repo| -> ServiceResult<Task> {
            if !repo.column_exists(&draft.column_id)? {
                return Err(ValidationError::UnknownColumn(draft.column_id.clone()).into());
            }
            let count = repo.count_tasks(&draft.column_id)?;
            let max = repo.max_position(&draft.column_id)?;
            if max.is_some_and(|max| max + 1 != count) {
                // Gap left by a delete without compaction: `count` may be taken.
                let order = ColumnOrder::from_tasks(
                    draft.column_id.clone(),
                    &repo.list_tasks(&draft.column_id)?,
                );
                repo.apply_assignments(&plan_compaction(&order))?;
            }
            repo.insert_task(&draft, count).map_err(ServiceError::from)
        });

        log_outcome("task_create", started_at, &result, |task| {
            format!("task_id={} column_id={} position={}", task.id, task.column_id, task.position)
        });
        result
    }

    /// Updates title and/or description in place.
    ///
    /// # Contract
    /// - At least one field must be supplied.
    /// - Title is trimmed; an empty description clears the field.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let changes = require_id(task_id, "task_id")
            .and_then(|_| patch.normalize())
            .inspect_err(|err| log_rejected("task_update", err))?;

        let result = self
            .repo
            .atomic(|repo| -> ServiceResult<Task> { Ok(repo.update_task(task_id, &changes)?) });

        log_outcome("task_update", started_at, &result, |task| {
            format!("task_id={}", task.id)
        });
        result
    }

    /// Deletes a task and returns the removed row.
    ///
    /// With `compact_on_delete` the remaining tasks of the column are
    /// renumbered in the same transaction; otherwise a position gap remains.
    pub fn delete_task(&self, task_id: &str) -> ServiceResult<Task> {
        let started_at = Instant::now();
        require_id(task_id, "task_id").inspect_err(|err| log_rejected("task_delete", err))?;
        let compact = self.options.compact_on_delete;

        let result = self.repo.atomic(|repo| -> ServiceResult<Task> {
            let task = repo
                .get_task(task_id)?
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            repo.delete_task(task_id)?;
            if compact {
                let order =
                    ColumnOrder::from_tasks(task.column_id.clone(), &repo.list_tasks(&task.column_id)?);
                repo.apply_assignments(&plan_compaction(&order))?;
            }
            Ok(task)
        });

        log_outcome("task_delete", started_at, &result, |task| {
            format!("task_id={} column_id={} compacted={}", task.id, task.column_id, compact)
        });
        result
    }

    /// Moves a task within or across columns.
    ///
    /// # Contract
    /// - `source_column_id` must be the task's current column.
    /// - `new_index` counts positions after the task is removed and is
    ///   clamped to the destination length.
    /// - Unknown task fails with `TaskNotFound`; unknown destination with
    ///   `ValidationError::UnknownColumn`.
    pub fn move_task(&self, intent: &MoveIntent) -> ServiceResult<MoveOutcome> {
        let started_at = Instant::now();
        intent
            .validate()
            .inspect_err(|err| log_rejected("task_move", err))?;

        let result = self.repo.atomic(|repo| -> ServiceResult<MoveOutcome> {
            let task = repo
                .get_task(&intent.task_id)?
                .ok_or_else(|| ServiceError::TaskNotFound(intent.task_id.clone()))?;
            if task.column_id != intent.source_column_id {
                return Err(ValidationError::SourceColumnMismatch {
                    task_id: task.id.clone(),
                    claimed: intent.source_column_id.clone(),
                    actual: task.column_id.clone(),
                }
                .into());
            }
            if !repo.column_exists(&intent.destination_column_id)? {
                return Err(
                    ValidationError::UnknownColumn(intent.destination_column_id.clone()).into(),
                );
            }

            let source =
                ColumnOrder::from_tasks(task.column_id.clone(), &repo.list_tasks(&task.column_id)?);
            let destination = if intent.is_same_column() {
                None
            } else {
                Some(ColumnOrder::from_tasks(
                    intent.destination_column_id.clone(),
                    &repo.list_tasks(&intent.destination_column_id)?,
                ))
            };

            let plan = plan_move(&source, destination.as_ref(), &task.id, intent.new_index)?;
            if plan.is_noop() {
                return Ok(MoveOutcome {
                    task,
                    rows_written: 0,
                });
            }

            repo.apply_assignments(&plan.assignments)?;
            let moved = repo
                .get_task(&task.id)?
                .ok_or_else(|| ServiceError::TaskNotFound(task.id.clone()))?;
            Ok(MoveOutcome {
                task: moved,
                rows_written: plan.assignments.len(),
            })
        });

        log_outcome("task_move", started_at, &result, |outcome| {
            format!(
                "task_id={} source_column_id={} destination_column_id={} requested_index={} position={} rows_written={}",
                outcome.task.id,
                intent.source_column_id,
                intent.destination_column_id,
                intent.new_index,
                outcome.task.position,
                outcome.rows_written
            )
        });
        result
    }

    /// Renumbers a column to `0..n-1`. Returns rows rewritten.
    pub fn compact_column(&self, column_id: &str) -> ServiceResult<usize> {
        let started_at = Instant::now();
        require_id(column_id, "column_id").inspect_err(|err| log_rejected("column_compact", err))?;

        let result = self.repo.atomic(|repo| -> ServiceResult<usize> {
            if !repo.column_exists(column_id)? {
                return Err(ValidationError::UnknownColumn(column_id.to_string()).into());
            }
            let order = ColumnOrder::from_tasks(column_id, &repo.list_tasks(column_id)?);
            let assignments = plan_compaction(&order);
            repo.apply_assignments(&assignments)?;
            Ok(assignments.len())
        });

        log_outcome("column_compact", started_at, &result, |rows| {
            format!("column_id={column_id} rows_written={rows}")
        });
        result
    }

    /// Loads one task.
    pub fn get_task(&self, task_id: &str) -> ServiceResult<Task> {
        self.repo
            .get_task(task_id)?
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))
    }

    /// Lists a column's tasks in display order. Read-only.
    pub fn list_tasks(&self, column_id: &str) -> ServiceResult<Vec<Task>> {
        if !self.repo.column_exists(column_id)? {
            return Err(ValidationError::UnknownColumn(column_id.to_string()).into());
        }
        Ok(self.repo.list_tasks(column_id)?)
    }
}

fn log_rejected(event: &str, err: &ValidationError) {
    warn!("event={event} module=service status=rejected error_code=validation error={err}");
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &ServiceResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => info!(
            "event={event} module=service status=ok duration_ms={duration_ms} {}",
            describe(value)
        ),
        Err(err) if matches!(err, ServiceError::StoreUnavailable(_)) => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
        Err(err) => warn!(
            "event={event} module=service status=rejected duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}
