//! Core module - storage, lexicon, sync and ingestion

pub mod codec;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod lexicon;
pub mod storage;
pub mod sync;

pub use codec::SnapshotError;
pub use config::{Config, ProfileKind};
pub use ingest::{Converter, ErrorPolicy, IngestError, IngestReport};
pub use lexicon::{
    Entry, EntryField, EntryPatch, Lexicon, NewEntry, SchemaProfile, SearchFilter, Statistics,
    StoreError,
};
pub use storage::{DirectoryStorage, KeyValueStorage, MemoryStorage, SnapshotPersistence, StorageSlot};
pub use sync::{ChangeNotifier, StorageMarker, SyncEvent, SyncMonitor};
