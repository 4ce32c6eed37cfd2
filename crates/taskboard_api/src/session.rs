//! Optimistic client session over a board transport.
//!
//! # Responsibility
//! - Keep a [`BoardMirror`] in sync with the service for one client.
//! - Drive each move as begin (local splice), call, settle.
//!
//! # Invariants
//! - A failed call restores the snapshot taken right before that move.
//! - Snapshots are reloaded only when no move is in flight.

use crate::{ApiResponse, BoardApi};
use log::info;
use taskboard_core::{BoardMirror, BoardSnapshot, MirrorError, MoveIntent, MoveTicket, Task};
use thiserror::Error;

/// Calls the session needs from the service side.
pub trait BoardTransport {
    fn fetch_board(&self) -> ApiResponse<BoardSnapshot>;
    fn send_move(&self, intent: &MoveIntent) -> ApiResponse<Task>;
}

impl BoardTransport for BoardApi {
    fn fetch_board(&self) -> ApiResponse<BoardSnapshot> {
        self.get_board()
    }

    fn send_move(&self, intent: &MoveIntent) -> ApiResponse<Task> {
        self.move_task(intent)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error("{0}")]
    Fetch(String),
}

/// Client-side board state with optimistic moves.
pub struct BoardSession<T: BoardTransport> {
    transport: T,
    mirror: BoardMirror,
}

impl<T: BoardTransport> BoardSession<T> {
    /// Loads the board through `transport`.
    pub fn connect(transport: T) -> Result<Self, SessionError> {
        let board = fetch(&transport)?;
        Ok(Self {
            transport,
            mirror: BoardMirror::new(board),
        })
    }

    pub fn mirror(&self) -> &BoardMirror {
        &self.mirror
    }

    pub fn board(&self) -> &BoardSnapshot {
        self.mirror.snapshot()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Applies the move locally, sends it and reconciles with the response.
    ///
    /// An intent the mirror cannot apply is rejected before anything is sent.
    pub fn move_task(&mut self, intent: MoveIntent) -> Result<ApiResponse<Task>, SessionError> {
        let ticket = self.begin(intent.clone())?;
        let response = self.transport.send_move(&intent);
        self.finish(ticket, &response)?;
        Ok(response)
    }

    /// First half of [`BoardSession::move_task`] for callers that keep
    /// several moves in flight.
    pub fn begin(&mut self, intent: MoveIntent) -> Result<MoveTicket, SessionError> {
        Ok(self.mirror.begin_move(intent)?)
    }

    /// Settles `ticket` from the service response.
    pub fn finish<D>(
        &mut self,
        ticket: MoveTicket,
        response: &ApiResponse<D>,
    ) -> Result<(), SessionError> {
        let result = if response.ok {
            Ok(())
        } else {
            Err(response.message.as_str())
        };
        self.mirror.settle(ticket, &result)?;
        info!(
            "event=session_move module=api status={} pending={}",
            if response.ok { "ok" } else { "rolled_back" },
            self.mirror.pending_count()
        );
        Ok(())
    }

    /// Replaces the mirror with a fresh service snapshot.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let board = fetch(&self.transport)?;
        self.mirror.replace(board)?;
        Ok(())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.mirror.last_error()
    }

    pub fn clear_error(&mut self) {
        self.mirror.clear_error();
    }
}

fn fetch<T: BoardTransport>(transport: &T) -> Result<BoardSnapshot, SessionError> {
    let response = transport.fetch_board();
    match response.data {
        Some(board) if response.ok => Ok(board),
        _ => Err(SessionError::Fetch(response.message)),
    }
}
