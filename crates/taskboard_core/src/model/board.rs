//! Board, column and snapshot types.

use crate::model::task::TaskId;
use serde::{Deserialize, Serialize};

/// Opaque board identifier.
pub type BoardId = String;
/// Opaque column identifier.
pub type ColumnId = String;

/// Persisted board row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Persisted column row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub board_id: BoardId,
    pub name: String,
    /// Rank among the board's columns, unique per board.
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Read model returned by `get_board` and mirrored by the client layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub id: BoardId,
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
}

/// One column of a [`BoardSnapshot`], tasks ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub id: ColumnId,
    pub name: String,
    pub position: i64,
    pub tasks: Vec<TaskSnapshot>,
}

/// One task card of a [`ColumnSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
}

impl BoardSnapshot {
    /// Returns the index of a column by id.
    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.id == column_id)
    }

    /// Returns a column by id.
    pub fn column(&self, column_id: &str) -> Option<&ColumnSnapshot> {
        self.columns.iter().find(|column| column.id == column_id)
    }

    /// Finds a task as `(column index, task index)`.
    pub fn locate_task(&self, task_id: &str) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(column_index, column)| {
                column
                    .tasks
                    .iter()
                    .position(|task| task.id == task_id)
                    .map(|task_index| (column_index, task_index))
            })
    }

    /// Task ids of one column in display order.
    pub fn task_ids(&self, column_id: &str) -> Vec<&str> {
        self.column(column_id)
            .map(|column| column.tasks.iter().map(|task| task.id.as_str()).collect())
            .unwrap_or_default()
    }
}

impl ColumnSnapshot {
    /// Rewrites in-memory positions to `0..n-1` in current list order.
    pub fn renumber(&mut self) {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.position = index as i64;
        }
    }
}

/// Initial content for one column created at board initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSeed {
    pub name: String,
    /// `(title, description)` pairs appended in order.
    pub tasks: Vec<(String, Option<String>)>,
}

/// Initial content for a board created at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSeed {
    pub name: String,
    pub columns: Vec<ColumnSeed>,
}

impl BoardSeed {
    /// Board with empty named columns.
    pub fn empty(name: impl Into<String>, column_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: column_names
                .iter()
                .map(|column_name| ColumnSeed {
                    name: (*column_name).to_string(),
                    tasks: Vec::new(),
                })
                .collect(),
        }
    }

    /// The sample board written by `taskboard init`.
    pub fn sample() -> Self {
        fn task(title: &str, description: Option<&str>) -> (String, Option<String>) {
            (title.to_string(), description.map(str::to_string))
        }

        Self {
            name: "My Kanban Board".to_string(),
            columns: vec![
                ColumnSeed {
                    name: "To Do".to_string(),
                    tasks: vec![
                        task("Setup project structure", None),
                        task("Design database schema", None),
                        task("Implement drag and drop", None),
                    ],
                },
                ColumnSeed {
                    name: "In Progress".to_string(),
                    tasks: vec![
                        task(
                            "Create task components",
                            Some("Build TaskCard, TaskForm components"),
                        ),
                        task("Setup Prisma and database", None),
                    ],
                },
                ColumnSeed {
                    name: "Done".to_string(),
                    tasks: vec![
                        task(
                            "Initialize Next.js project",
                            Some("Setup Next.js 15 with TypeScript"),
                        ),
                        task("Install dependencies", None),
                    ],
                },
            ],
        }
    }
}
