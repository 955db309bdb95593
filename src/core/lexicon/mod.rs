//! SQLite-backed lexicon store
//!
//! The whole database lives in an in-memory SQLite connection. After every
//! mutation the store exports the database, writes it to its persistence
//! slot and publishes a change marker so other handles on the same slot can
//! reload.
//!
//! A store starts uninitialized; [`Lexicon::init`] either restores the
//! persisted snapshot or creates and seeds a fresh database. Queries on an
//! uninitialized store return empty results, mutations return
//! [`StoreError::NotInitialized`].

mod mutations;
mod portable;
mod queries;
mod schema;
mod seed;
mod types;

#[cfg(test)]
mod tests;

pub use portable::{PortableDocument, PortableMetadata};
pub use schema::{DeletePolicy, SchemaProfile, UniquenessScope, SCHEMA_VERSION};
pub use seed::DEFAULT_CATEGORIES;
pub use types::*;

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::core::engine;
use crate::core::storage::SnapshotPersistence;
use crate::core::sync::{snapshot_marker, ChangeNotifier};

/// The lexicon store
///
/// Several handles may share one persistence slot. Each save overwrites the
/// whole snapshot, so concurrent writers race and the last save wins; the
/// others only see the result after a [`Lexicon::reload`].
pub struct Lexicon {
    conn: Option<Connection>,
    profile: SchemaProfile,
    persistence: Box<dyn SnapshotPersistence>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    last_marker: Option<String>,
}

impl Lexicon {
    /// Create an uninitialized store over the given persistence slot
    pub fn new(profile: SchemaProfile, persistence: impl SnapshotPersistence + 'static) -> Self {
        Self {
            conn: None,
            profile,
            persistence: Box::new(persistence),
            notifier: None,
            last_marker: None,
        }
    }

    /// Publish a change marker through `notifier` after each save
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn profile(&self) -> &SchemaProfile {
        &self.profile
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    /// Marker published by this handle's most recent save
    pub fn last_marker(&self) -> Option<&str> {
        self.last_marker.as_deref()
    }

    /// Restore the persisted snapshot, or create and seed a new database
    ///
    /// Calling `init` on an initialized store does nothing. A slot that holds
    /// an unreadable snapshot is reported and left untouched.
    pub fn init(&mut self) -> Result<(), StoreError> {
        if self.conn.is_some() {
            return Ok(());
        }

        match self.persistence.load()? {
            Some(bytes) => {
                let conn = engine::open_snapshot(&bytes)?;
                schema::create_schema(&conn, &self.profile).map_err(|e| {
                    StoreError::Initialization {
                        reason: e.to_string(),
                    }
                })?;
                debug!(bytes = bytes.len(), "restored lexicon snapshot");
                self.conn = Some(conn);
            }
            None => {
                let conn = engine::open_blank().map_err(|e| StoreError::Initialization {
                    reason: e.to_string(),
                })?;
                schema::create_schema(&conn, &self.profile)
                    .and_then(|_| seed::seed_defaults(&conn, &self.profile))
                    .map_err(|e| StoreError::Initialization {
                        reason: e.to_string(),
                    })?;
                info!(profile = self.profile.name, "created new lexicon");
                self.conn = Some(conn);
                self.persist();
            }
        }

        Ok(())
    }

    /// Discard the in-memory database and restore the persisted snapshot
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let previous = self.conn.take();
        match self.init() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.conn = previous;
                Err(e)
            }
        }
    }

    /// Drop the in-memory database; the store becomes uninitialized
    pub fn close(&mut self) {
        self.conn = None;
    }

    pub(crate) fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::NotInitialized)
    }

    pub(crate) fn conn_mut(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::NotInitialized)
    }

    /// Export the database and write it to the persistence slot
    ///
    /// Failures are logged; the in-memory state stays authoritative.
    pub(crate) fn persist(&mut self) {
        let Some(conn) = self.conn.as_ref() else {
            return;
        };

        let bytes = match engine::export_snapshot(conn) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to export lexicon snapshot");
                return;
            }
        };

        if let Err(e) = self.persistence.save(&bytes) {
            warn!(error = %e, "failed to save lexicon snapshot");
            return;
        }

        let marker = snapshot_marker(&bytes, Utc::now());
        if let Some(notifier) = &self.notifier {
            notifier.publish(&marker);
        }
        debug!(bytes = bytes.len(), %marker, "saved lexicon snapshot");
        self.last_marker = Some(marker);
    }

    /// Export the full database as snapshot bytes
    pub fn export_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        Ok(engine::export_snapshot(self.conn()?)?)
    }

    /// Replace the database with the given snapshot bytes
    ///
    /// The current database stays in place if the bytes can't be opened.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        let conn = engine::open_snapshot(bytes)?;
        schema::create_schema(&conn, &self.profile)?;
        self.conn = Some(conn);
        self.persist();
        Ok(())
    }

    /// Export a binary backup with its size and timestamp
    pub fn backup(&self) -> Result<Backup, StoreError> {
        let data = self.export_snapshot()?;
        Ok(Backup {
            size: data.len(),
            data,
            timestamp: Utc::now(),
        })
    }
}
