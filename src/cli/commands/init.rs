//! `emakhua init` command - create the lexicon in the storage directory

use console::style;
use miette::Result;
use std::sync::Arc;

use crate::cli::helpers::{open_storage, resolve_config};
use crate::cli::GlobalOpts;
use crate::core::lexicon::Lexicon;
use crate::core::storage::{SnapshotPersistence, StorageSlot};
use crate::core::sync::StorageMarker;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Discard the stored snapshot and start from the seeded defaults
    #[arg(long)]
    pub reset: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let config = resolve_config(global);
    let storage = open_storage(&config)?;
    let profile = config.schema_profile();
    let slot = StorageSlot::new(storage.clone(), profile.storage_key.clone());

    if args.reset {
        slot.clear()?;
        tracing::info!(key = slot.key(), "cleared stored snapshot");
    }
    let existed = slot.load()?.is_some();

    let mut lexicon =
        Lexicon::new(profile, slot).with_notifier(Arc::new(StorageMarker::new(storage.clone())));
    lexicon.init()?;

    if global.quiet {
        return Ok(());
    }

    let verb = if existed { "Opened" } else { "Created" };
    println!(
        "{} {} {} lexicon in {}",
        style("✓").green(),
        verb,
        lexicon.profile().name,
        style(storage.root().display()).cyan()
    );
    println!(
        "  {} words, {} categories",
        lexicon.total_entries(),
        lexicon.categories().len()
    );
    if !existed {
        println!();
        println!("Next steps:");
        println!("  {} Add a word", style("emakhua add <emakhua> <portugues>").yellow());
        println!("  {} Search the lexicon", style("emakhua search <term>").yellow());
    }
    Ok(())
}
