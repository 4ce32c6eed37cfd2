//! Store connection bootstrap.
//!
//! # Responsibility
//! - Open the board database from a file or in memory.
//! - Apply connection pragmas and schema migrations before handing it out.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and the configured busy
//!   timeout.
//! - Returned connections are at the latest schema version.

use super::migrations::apply_migrations;
use super::{DbError, DbOptions, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a board database file with default options.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_options(path, DbOptions::default())
}

/// Opens a board database file, creating it when absent.
///
/// # Side effects
/// - Runs pending migrations.
/// - Emits `db_open` events with duration and status.
pub fn open_db_with_options(path: impl AsRef<Path>, options: DbOptions) -> DbResult<Connection> {
    open_logged("file", options, || Connection::open(path))
}

/// Opens a private in-memory board database; used by tests and tooling.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_logged("memory", DbOptions::default(), Connection::open_in_memory)
}

fn open_logged(
    mode: &str,
    options: DbOptions,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(|err| ("db_open_failed", DbError::from(err)))
        .and_then(|mut conn| {
            bootstrap(&mut conn, options)
                .map(|()| conn)
                .map_err(|err| ("db_bootstrap_failed", err))
        });

    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(conn) => {
            info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}");
            Ok(conn)
        }
        Err((error_code, err)) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error_code={error_code} error={err}"
            );
            Err(err)
        }
    }
}

fn bootstrap(conn: &mut Connection, options: DbOptions) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(options.busy_timeout)?;
    apply_migrations(conn)
}
