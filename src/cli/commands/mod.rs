//! CLI command implementations

pub mod backup;
pub mod completions;
pub mod convert;
pub mod db;
pub mod init;
pub mod stats;
pub mod watch;
pub mod word;
