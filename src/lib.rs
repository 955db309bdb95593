//! Emakhua lexicon
//!
//! An Emakhua–Portuguese dictionary store backed by an in-memory SQLite
//! database persisted as a snapshot in a key-value slot, a change monitor
//! that tells other handles on the same slot when to reload, and a converter
//! from the JSON word corpus to a normalized SQLite file.

pub mod cli;
pub mod core;
