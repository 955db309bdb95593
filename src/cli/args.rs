//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    backup::{BackupCommands, PortableCommands},
    completions::CompletionsArgs,
    convert::ConvertArgs,
    db::DbCommands,
    init::InitArgs,
    stats::StatsArgs,
    watch::WatchArgs,
    word::{AddArgs, RemoveArgs, SearchArgs, ShowArgs, UpdateArgs},
};
use crate::core::ProfileKind;

#[derive(Parser)]
#[command(name = "emakhua")]
#[command(author, version, about = "Emakhua–Portuguese lexicon store and corpus converter")]
#[command(long_about = "Keeps an Emakhua–Portuguese dictionary in a SQLite snapshot shared by every invocation, and converts the JSON word corpus into a normalized SQLite database.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose (debug) logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding the storage slots (default: from config)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Store variant (default: from config, else full)
    #[arg(long, global = true, value_enum)]
    pub profile: Option<ProfileKind>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a JSON word corpus into a SQLite database
    Convert(ConvertArgs),

    /// Create (or reset) the lexicon in the storage directory
    Init(InitArgs),

    /// Add a word
    Add(AddArgs),

    /// Search words by Emakhua or Portuguese text
    Search(SearchArgs),

    /// Show one word with its categories
    Show(ShowArgs),

    /// Change fields of a word
    Update(UpdateArgs),

    /// Remove a word (soft delete in the shared profile)
    Remove(RemoveArgs),

    /// Show lexicon statistics
    Stats(StatsArgs),

    /// Binary snapshot backup and restore
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Portable JSON export and import
    #[command(subcommand)]
    Portable(PortableCommands),

    /// Watch the storage directory and reload when another process writes
    Watch(WatchArgs),

    /// Inspect or optimize a converted database file
    #[command(subcommand)]
    Db(DbCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Md,
}
