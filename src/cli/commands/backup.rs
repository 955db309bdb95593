//! `emakhua backup` and `emakhua portable` commands
//!
//! Backups are raw SQLite snapshot bytes. The portable format is JSON with
//! `palavras`, `categorias` and `metadados`, readable by other tools.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::open_lexicon;
use crate::cli::GlobalOpts;

#[derive(clap::Subcommand, Debug)]
pub enum BackupCommands {
    /// Write the database snapshot to a file
    Export {
        /// Destination file
        output: PathBuf,
    },
    /// Replace the lexicon with a snapshot file
    Import {
        /// Snapshot file written by `backup export`
        input: PathBuf,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum PortableCommands {
    /// Export every word and category as JSON
    Export {
        /// Destination file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Replace the lexicon with a portable JSON document
    Import {
        /// JSON file written by `portable export`
        input: PathBuf,
    },
}

pub fn run_backup(cmd: BackupCommands, global: &GlobalOpts) -> Result<()> {
    let mut lexicon = open_lexicon(global)?;

    match cmd {
        BackupCommands::Export { output } => {
            let backup = lexicon.backup()?;
            fs::write(&output, &backup.data).into_diagnostic()?;
            if !global.quiet {
                println!(
                    "{} Wrote {} bytes to {} ({})",
                    style("✓").green(),
                    backup.size,
                    style(output.display()).cyan(),
                    backup.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        BackupCommands::Import { input } => {
            let bytes = fs::read(&input).into_diagnostic()?;
            lexicon.import_snapshot(&bytes)?;
            if !global.quiet {
                println!(
                    "{} Restored {} words from {}",
                    style("✓").green(),
                    lexicon.total_entries(),
                    style(input.display()).cyan()
                );
            }
        }
    }
    Ok(())
}

pub fn run_portable(cmd: PortableCommands, global: &GlobalOpts) -> Result<()> {
    let mut lexicon = open_lexicon(global)?;

    match cmd {
        PortableCommands::Export { output } => {
            let json = lexicon.export_portable()?;
            match output {
                Some(path) => {
                    fs::write(&path, json).into_diagnostic()?;
                    if !global.quiet {
                        println!(
                            "{} Exported {} words to {}",
                            style("✓").green(),
                            lexicon.total_entries(),
                            style(path.display()).cyan()
                        );
                    }
                }
                None => println!("{}", json),
            }
        }
        PortableCommands::Import { input } => {
            let json = fs::read_to_string(&input).into_diagnostic()?;
            let imported = lexicon.import_portable(&json)?;
            if !global.quiet {
                println!(
                    "{} Imported {} words from {}",
                    style("✓").green(),
                    imported,
                    style(input.display()).cyan()
                );
            }
        }
    }
    Ok(())
}
