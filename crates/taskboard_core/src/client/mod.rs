//! Client-side board mirror with optimistic moves.
//!
//! # Responsibility
//! - Apply move intents locally before the service answers.
//! - Confirm or roll back each move from its own snapshot.
//!
//! # Invariants
//! - Every pending move owns the snapshot taken right before it was applied.
//! - A confirmed move stays replayable until every earlier move has settled.
//! - The mirror never performs I/O.

mod mirror;

pub use mirror::{BoardMirror, MirrorError, MoveTicket};
