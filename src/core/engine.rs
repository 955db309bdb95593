//! SQL engine capability
//!
//! The lexicon runs on an in-memory SQLite connection. This module owns the
//! three things the store needs from the engine beyond plain SQL: a blank
//! database, exporting the whole database as snapshot bytes, and opening a
//! new database from snapshot bytes.
//!
//! Snapshots go through SQLite's online backup API with a scratch file, so
//! the bytes are a regular SQLite database file and can be opened by any
//! SQLite tool.

use std::fs;

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};

use super::codec::SnapshotError;

const SCRATCH_FILE: &str = "snapshot.db";

/// Open an empty in-memory database with foreign keys enforced
pub fn open_blank() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}

/// Export the full database as snapshot bytes
pub fn export_snapshot(conn: &Connection) -> Result<Vec<u8>, SnapshotError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(SCRATCH_FILE);
    conn.backup(DatabaseName::Main, &path, None)?;
    Ok(fs::read(&path)?)
}

/// Open a new in-memory database holding the given snapshot bytes
///
/// Empty bytes produce an empty database. Bytes that are not a SQLite
/// database are rejected with [`SnapshotError::Engine`].
pub fn open_snapshot(bytes: &[u8]) -> Result<Connection, SnapshotError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(SCRATCH_FILE);
    fs::write(&path, bytes)?;

    let mut conn = Connection::open_in_memory()?;
    conn.restore(DatabaseName::Main, &path, None::<fn(Progress)>)?;
    configure(&conn)?;

    // Force a read so a bogus file fails here rather than on first query
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })?;

    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}
