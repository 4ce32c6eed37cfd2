//! Board domain model.
//!
//! # Responsibility
//! - Define the records persisted by the order store.
//! - Define the read snapshot shared by the service and the client mirror.
//! - Own field validation so every caller applies the same limits.
//!
//! # Invariants
//! - A task belongs to exactly one column.
//! - Within a column at rest, positions are `0..n-1` without duplicates.

pub mod board;
pub mod task;
