//! Pure task reordering engine.
//!
//! # Responsibility
//! - Compute position assignments that realize a move or a compaction.
//! - Share the list splice used by both the store path and the client mirror.
//!
//! # Invariants
//! - No I/O; every function is deterministic in its inputs.
//! - After applying a plan, every touched column is numbered `0..n-1`.
//! - Only rows whose `(column, position)` changes appear in a plan.

use crate::model::board::ColumnId;
use crate::model::task::{Task, TaskId};
use std::collections::HashMap;
use thiserror::Error;

/// Engine input that does not describe a consistent board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("task {task_id} is not in column {column_id}")]
    TaskNotInSource { task_id: TaskId, column_id: ColumnId },
    #[error("task {0} already present in destination column")]
    AlreadyInDestination(TaskId),
}

/// One task entry of a column as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTask {
    pub task_id: TaskId,
    pub position: i64,
}

/// Current order of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    pub column_id: ColumnId,
    tasks: Vec<OrderedTask>,
}

impl ColumnOrder {
    /// Builds a column order, sorting by `position ASC, task_id ASC`.
    pub fn new(column_id: impl Into<ColumnId>, mut tasks: Vec<OrderedTask>) -> Self {
        tasks.sort_by(|left, right| {
            left.position
                .cmp(&right.position)
                .then_with(|| left.task_id.cmp(&right.task_id))
        });
        Self {
            column_id: column_id.into(),
            tasks,
        }
    }

    /// Builds a column order from persisted rows.
    pub fn from_tasks(column_id: impl Into<ColumnId>, tasks: &[Task]) -> Self {
        Self::new(
            column_id,
            tasks
                .iter()
                .map(|task| OrderedTask {
                    task_id: task.id.clone(),
                    position: task.position,
                })
                .collect(),
        )
    }

    pub fn tasks(&self) -> &[OrderedTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.task_id == task_id)
    }

    /// Whether positions already read `0..n-1`.
    pub fn is_contiguous(&self) -> bool {
        self.tasks
            .iter()
            .enumerate()
            .all(|(index, task)| task.position == index as i64)
    }

    fn ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.task_id.as_str()).collect()
    }
}

/// Final `(column, position)` for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub column_id: ColumnId,
    pub position: i64,
}

/// Result of planning a move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePlan {
    /// Rows to rewrite, source column first, each column in final order.
    pub assignments: Vec<Assignment>,
    /// Index the moving task ends up at in its destination column.
    pub final_index: usize,
}

impl MovePlan {
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Clamps a requested insertion index into `[0, len]`.
pub fn clamp_index(requested: usize, len: usize) -> usize {
    requested.min(len)
}

/// Moves the item at `from` out of `source` and inserts it into
/// `destination` (or back into `source` when `None`) at the clamped
/// `requested` index.
///
/// Returns the final index, or `None` when `from` is out of range.
pub fn splice<T>(
    source: &mut Vec<T>,
    destination: Option<&mut Vec<T>>,
    from: usize,
    requested: usize,
) -> Option<usize> {
    if from >= source.len() {
        return None;
    }
    let item = source.remove(from);
    let target = destination.unwrap_or(source);
    let index = clamp_index(requested, target.len());
    target.insert(index, item);
    Some(index)
}

/// Plans the relocation of `task_id`.
///
/// `destination` is `None` for a same-column move. A same-column move to the
/// task's current index yields an empty plan even when the column has gaps.
pub fn plan_move(
    source: &ColumnOrder,
    destination: Option<&ColumnOrder>,
    task_id: &str,
    requested_index: usize,
) -> Result<MovePlan, ReorderError> {
    let from = source
        .index_of(task_id)
        .ok_or_else(|| ReorderError::TaskNotInSource {
            task_id: task_id.to_string(),
            column_id: source.column_id.clone(),
        })?;

    let destination = destination.filter(|column| column.column_id != source.column_id);

    let Some(destination) = destination else {
        let mut ids = source.ids();
        let final_index = splice(&mut ids, None, from, requested_index).unwrap_or(from);
        if final_index == from {
            return Ok(MovePlan {
                assignments: Vec::new(),
                final_index,
            });
        }
        return Ok(MovePlan {
            assignments: renumber(source, &ids, &source.column_id),
            final_index,
        });
    };

    if destination.index_of(task_id).is_some() {
        return Err(ReorderError::AlreadyInDestination(task_id.to_string()));
    }

    let mut source_ids = source.ids();
    let mut destination_ids = destination.ids();
    let final_index = splice(
        &mut source_ids,
        Some(&mut destination_ids),
        from,
        requested_index,
    )
    .unwrap_or_default();

    let mut assignments = renumber(source, &source_ids, &source.column_id);
    assignments.extend(renumber(
        destination,
        &destination_ids,
        &destination.column_id,
    ));
    Ok(MovePlan {
        assignments,
        final_index,
    })
}

/// Plans a renumbering of one column to `0..n-1`, keeping relative order.
pub fn plan_compaction(column: &ColumnOrder) -> Vec<Assignment> {
    renumber(column, &column.ids(), &column.column_id)
}

/// Emits assignments for `ordered_ids` enumerated from 0, skipping tasks
/// already at that position in `column`. Tasks not found in `column` are
/// arriving from elsewhere and always emitted.
fn renumber(column: &ColumnOrder, ordered_ids: &[&str], column_id: &str) -> Vec<Assignment> {
    let current: HashMap<&str, i64> = column
        .tasks
        .iter()
        .map(|task| (task.task_id.as_str(), task.position))
        .collect();

    ordered_ids
        .iter()
        .enumerate()
        .filter_map(|(index, task_id)| {
            let position = index as i64;
            if current.get(task_id) == Some(&position) {
                return None;
            }
            Some(Assignment {
                task_id: (*task_id).to_string(),
                column_id: column_id.to_string(),
                position,
            })
        })
        .collect()
}
