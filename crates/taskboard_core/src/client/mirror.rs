use crate::model::board::{BoardSnapshot, ColumnId, ColumnSnapshot};
use crate::model::task::{MoveIntent, TaskId};
use crate::reorder::splice;
use log::{debug, warn};
use std::fmt::Display;
use thiserror::Error;

/// Handle for one optimistic move awaiting the service response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    #[error("task not on board: {0}")]
    UnknownTask(TaskId),
    #[error("column not on board: {0}")]
    UnknownColumn(ColumnId),
    #[error("task {task_id} is shown in column {actual}, not {claimed}")]
    SourceColumnMismatch {
        task_id: TaskId,
        claimed: ColumnId,
        actual: ColumnId,
    },
    #[error("no pending move for ticket {0:?}")]
    UnknownTicket(MoveTicket),
    #[error("{0} move(s) still pending")]
    MovesPending(usize),
}

/// A move applied locally. Kept until it and every move begun before it
/// have settled, so a later rollback can replay it.
#[derive(Debug, Clone)]
struct AppliedMove {
    ticket: MoveTicket,
    intent: MoveIntent,
    snapshot: BoardSnapshot,
    confirmed: bool,
}

/// Local copy of the board used for immediate feedback.
#[derive(Debug, Clone)]
pub struct BoardMirror {
    board: BoardSnapshot,
    moves: Vec<AppliedMove>,
    next_ticket: u64,
    last_error: Option<String>,
}

impl BoardMirror {
    pub fn new(board: BoardSnapshot) -> Self {
        Self {
            board,
            moves: Vec::new(),
            next_ticket: 1,
            last_error: None,
        }
    }

    /// Current (possibly optimistic) board state.
    pub fn snapshot(&self) -> &BoardSnapshot {
        &self.board
    }

    /// Moves still awaiting a service response.
    pub fn pending_count(&self) -> usize {
        self.moves.iter().filter(|applied| !applied.confirmed).count()
    }

    /// Error indicator set by the latest rollback.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Replaces local state with a fresh server snapshot.
    pub fn replace(&mut self, board: BoardSnapshot) -> Result<(), MirrorError> {
        let pending = self.pending_count();
        if pending > 0 {
            return Err(MirrorError::MovesPending(pending));
        }
        self.moves.clear();
        self.board = board;
        Ok(())
    }

    /// Applies `intent` locally and records the pre-move snapshot.
    pub fn begin_move(&mut self, intent: MoveIntent) -> Result<MoveTicket, MirrorError> {
        let snapshot = self.board.clone();
        apply_intent(&mut self.board, &intent)?;

        let ticket = MoveTicket(self.next_ticket);
        self.next_ticket += 1;
        self.moves.push(AppliedMove {
            ticket,
            intent,
            snapshot,
            confirmed: false,
        });
        debug!(
            "event=mirror_move module=mirror status=start ticket={} pending={}",
            ticket.0,
            self.pending_count()
        );
        Ok(ticket)
    }

    /// Accepts the optimistic state of `ticket`.
    pub fn confirm(&mut self, ticket: MoveTicket) -> Result<(), MirrorError> {
        let index = self.pending_index(ticket)?;
        self.moves[index].confirmed = true;
        self.prune_settled();
        debug!(
            "event=mirror_move module=mirror status=ok ticket={}",
            ticket.0
        );
        Ok(())
    }

    /// Restores the snapshot taken before `ticket` and replays every move
    /// begun after it, confirmed or still pending.
    pub fn rollback(&mut self, ticket: MoveTicket, message: impl Into<String>) -> Result<(), MirrorError> {
        let index = self.pending_index(ticket)?;
        let failed = self.moves.remove(index);
        self.board = failed.snapshot;

        let later: Vec<AppliedMove> = self.moves.drain(index..).collect();
        for mut applied in later {
            applied.snapshot = self.board.clone();
            if let Err(err) = apply_intent(&mut self.board, &applied.intent) {
                // Kept with a snapshot equal to the current board so its own
                // rollback is a no-op locally.
                warn!(
                    "event=mirror_replay module=mirror status=skipped ticket={} error={}",
                    applied.ticket.0, err
                );
            }
            self.moves.push(applied);
        }
        self.prune_settled();

        let message = message.into();
        warn!(
            "event=mirror_move module=mirror status=rolled_back ticket={} error={}",
            ticket.0, message
        );
        self.last_error = Some(message);
        Ok(())
    }

    /// Confirms on `Ok`, rolls back with the error text on `Err`.
    pub fn settle<T, E: Display>(
        &mut self,
        ticket: MoveTicket,
        result: &Result<T, E>,
    ) -> Result<(), MirrorError> {
        match result {
            Ok(_) => self.confirm(ticket),
            Err(err) => self.rollback(ticket, err.to_string()),
        }
    }

    fn pending_index(&self, ticket: MoveTicket) -> Result<usize, MirrorError> {
        self.moves
            .iter()
            .position(|applied| applied.ticket == ticket && !applied.confirmed)
            .ok_or(MirrorError::UnknownTicket(ticket))
    }

    /// Drops confirmed moves that no earlier pending move can rewind.
    fn prune_settled(&mut self) {
        let settled = self
            .moves
            .iter()
            .take_while(|applied| applied.confirmed)
            .count();
        self.moves.drain(..settled);
    }
}

/// Splices the task into its destination and renumbers touched columns.
/// Leaves `board` untouched on error.
fn apply_intent(board: &mut BoardSnapshot, intent: &MoveIntent) -> Result<(), MirrorError> {
    let (source_index, from) = board
        .locate_task(&intent.task_id)
        .ok_or_else(|| MirrorError::UnknownTask(intent.task_id.clone()))?;
    let actual = &board.columns[source_index].id;
    if *actual != intent.source_column_id {
        return Err(MirrorError::SourceColumnMismatch {
            task_id: intent.task_id.clone(),
            claimed: intent.source_column_id.clone(),
            actual: actual.clone(),
        });
    }
    let destination_index = board
        .column_index(&intent.destination_column_id)
        .ok_or_else(|| MirrorError::UnknownColumn(intent.destination_column_id.clone()))?;

    if source_index == destination_index {
        let column = &mut board.columns[source_index];
        splice(&mut column.tasks, None, from, intent.new_index);
        column.renumber();
        return Ok(());
    }

    let (source, destination) = pair_mut(&mut board.columns, source_index, destination_index);
    splice(&mut source.tasks, Some(&mut destination.tasks), from, intent.new_index);
    source.renumber();
    destination.renumber();
    Ok(())
}

fn pair_mut(
    columns: &mut [ColumnSnapshot],
    first: usize,
    second: usize,
) -> (&mut ColumnSnapshot, &mut ColumnSnapshot) {
    if first < second {
        let (head, tail) = columns.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = columns.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardMirror, MirrorError};
    use crate::model::board::{BoardSnapshot, ColumnSnapshot, TaskSnapshot};
    use crate::model::task::MoveIntent;

    fn board() -> BoardSnapshot {
        let column = |id: &str, position: i64, tasks: &[&str]| ColumnSnapshot {
            id: id.to_string(),
            name: id.to_uppercase(),
            position,
            tasks: tasks
                .iter()
                .enumerate()
                .map(|(index, task)| TaskSnapshot {
                    id: (*task).to_string(),
                    title: format!("Task {task}"),
                    description: None,
                    position: index as i64,
                })
                .collect(),
        };
        BoardSnapshot {
            id: "board".to_string(),
            name: "Board".to_string(),
            columns: vec![
                column("a", 0, &["t1", "t2", "t3"]),
                column("b", 1, &["t4"]),
                column("c", 2, &[]),
            ],
        }
    }

    fn positions(mirror: &BoardMirror, column_id: &str) -> Vec<i64> {
        mirror
            .snapshot()
            .column(column_id)
            .map(|column| column.tasks.iter().map(|task| task.position).collect())
            .unwrap_or_default()
    }

    #[test]
    fn begin_move_applies_immediately() {
        let mut mirror = BoardMirror::new(board());
        mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 1))
            .unwrap();

        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t2", "t3"]);
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t4", "t1"]);
        assert_eq!(positions(&mirror, "a"), vec![0, 1]);
        assert_eq!(positions(&mirror, "b"), vec![0, 1]);
        assert_eq!(mirror.pending_count(), 1);
    }

    #[test]
    fn confirm_keeps_optimistic_state() {
        let mut mirror = BoardMirror::new(board());
        let ticket = mirror
            .begin_move(MoveIntent::new("t3", "a", "a", 0))
            .unwrap();
        mirror.confirm(ticket).unwrap();

        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t3", "t1", "t2"]);
        assert_eq!(mirror.pending_count(), 0);
        assert_eq!(mirror.last_error(), None);
    }

    #[test]
    fn rollback_restores_snapshot_and_sets_error() {
        let original = board();
        let mut mirror = BoardMirror::new(original.clone());
        let ticket = mirror
            .begin_move(MoveIntent::new("t2", "a", "c", 0))
            .unwrap();
        mirror.rollback(ticket, "store unavailable").unwrap();

        assert_eq!(mirror.snapshot(), &original);
        assert_eq!(mirror.last_error(), Some("store unavailable"));
        mirror.clear_error();
        assert_eq!(mirror.last_error(), None);
    }

    #[test]
    fn rollback_of_first_move_keeps_later_pending_move() {
        let mut mirror = BoardMirror::new(board());
        let first = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        let second = mirror
            .begin_move(MoveIntent::new("t3", "a", "c", 0))
            .unwrap();

        mirror.rollback(first, "network error").unwrap();
        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t1", "t2"]);
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t4"]);
        assert_eq!(mirror.snapshot().task_ids("c"), vec!["t3"]);

        mirror.confirm(second).unwrap();
        assert_eq!(mirror.pending_count(), 0);
        assert_eq!(mirror.snapshot().task_ids("c"), vec!["t3"]);
    }

    #[test]
    fn rollback_of_second_move_uses_its_own_snapshot() {
        let mut mirror = BoardMirror::new(board());
        let first = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        let second = mirror
            .begin_move(MoveIntent::new("t2", "a", "b", 5))
            .unwrap();

        mirror.rollback(second, "conflict").unwrap();
        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t2", "t3"]);
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t1", "t4"]);

        mirror.confirm(first).unwrap();
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t1", "t4"]);
    }

    #[test]
    fn confirm_later_then_roll_back_earlier_keeps_confirmed_move() {
        let mut mirror = BoardMirror::new(board());
        let first = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        let second = mirror
            .begin_move(MoveIntent::new("t2", "a", "c", 0))
            .unwrap();

        mirror.confirm(second).unwrap();
        assert_eq!(mirror.pending_count(), 1);

        mirror.rollback(first, "network error").unwrap();
        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t1", "t3"]);
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t4"]);
        assert_eq!(mirror.snapshot().task_ids("c"), vec!["t2"]);
        assert_eq!(positions(&mirror, "a"), vec![0, 1]);
        assert_eq!(mirror.pending_count(), 0);
        assert!(matches!(
            mirror.confirm(second),
            Err(MirrorError::UnknownTicket(_))
        ));
    }

    #[test]
    fn confirmed_moves_are_released_once_earlier_moves_settle() {
        let mut mirror = BoardMirror::new(board());
        let first = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        let second = mirror
            .begin_move(MoveIntent::new("t2", "a", "c", 0))
            .unwrap();

        mirror.confirm(second).unwrap();
        assert_eq!(mirror.replace(board()), Err(MirrorError::MovesPending(1)));

        mirror.confirm(first).unwrap();
        assert_eq!(mirror.pending_count(), 0);
        assert_eq!(mirror.snapshot().task_ids("b"), vec!["t1", "t4"]);
        assert_eq!(mirror.snapshot().task_ids("c"), vec!["t2"]);
        assert!(mirror.replace(board()).is_ok());
    }

    #[test]
    fn unreplayable_later_move_stays_pending_without_effect() {
        let mut mirror = BoardMirror::new(board());
        let first = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        let second = mirror
            .begin_move(MoveIntent::new("t1", "b", "c", 0))
            .unwrap();

        mirror.rollback(first, "failed").unwrap();
        assert_eq!(mirror.snapshot().task_ids("a"), vec!["t1", "t2", "t3"]);
        assert_eq!(mirror.pending_count(), 1);

        mirror.rollback(second, "failed too").unwrap();
        assert_eq!(mirror.snapshot(), &board());
    }

    #[test]
    fn invalid_intent_leaves_state_untouched() {
        let mut mirror = BoardMirror::new(board());
        let err = mirror
            .begin_move(MoveIntent::new("t4", "a", "b", 0))
            .unwrap_err();
        assert!(matches!(err, MirrorError::SourceColumnMismatch { .. }));

        let err = mirror
            .begin_move(MoveIntent::new("t1", "a", "zzz", 0))
            .unwrap_err();
        assert_eq!(err, MirrorError::UnknownColumn("zzz".to_string()));
        assert_eq!(mirror.snapshot(), &board());
        assert_eq!(mirror.pending_count(), 0);
    }

    #[test]
    fn settle_dispatches_on_result() {
        let mut mirror = BoardMirror::new(board());
        let ticket = mirror
            .begin_move(MoveIntent::new("t1", "a", "a", 2))
            .unwrap();
        let failed: Result<(), String> = Err("boom".to_string());
        mirror.settle(ticket, &failed).unwrap();
        assert_eq!(mirror.snapshot(), &board());

        assert!(matches!(
            mirror.settle(ticket, &failed),
            Err(MirrorError::UnknownTicket(_))
        ));
    }

    #[test]
    fn replace_is_refused_while_moves_are_pending() {
        let mut mirror = BoardMirror::new(board());
        let ticket = mirror
            .begin_move(MoveIntent::new("t1", "a", "b", 0))
            .unwrap();
        assert_eq!(mirror.replace(board()), Err(MirrorError::MovesPending(1)));
        mirror.confirm(ticket).unwrap();
        assert!(mirror.replace(board()).is_ok());
        assert_eq!(mirror.snapshot(), &board());
    }
}
