//! Shared helper functions for CLI commands
//!
//! Opening the lexicon the way every store command does, and a few display
//! helpers used across command modules.

use std::sync::Arc;

use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lexicon::{Entry, Lexicon};
use crate::core::storage::{DirectoryStorage, StorageSlot};
use crate::core::sync::StorageMarker;
use crate::core::Config;

/// Load config files and environment, then apply command-line flags
pub fn resolve_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    if let Some(ref dir) = global.storage {
        config.storage_dir = Some(dir.clone());
    }
    if let Some(profile) = global.profile {
        config.profile = Some(profile);
    }
    config
}

/// Open the configured storage directory
pub fn open_storage(config: &Config) -> Result<DirectoryStorage> {
    Ok(DirectoryStorage::open(config.storage_dir())?)
}

/// Open and initialize the lexicon over the configured storage directory
///
/// Saves publish a marker under `db_last_update` for `watch` to pick up.
pub fn open_lexicon(global: &GlobalOpts) -> Result<Lexicon> {
    let config = resolve_config(global);
    let storage = open_storage(&config)?;
    let profile = config.schema_profile();

    let slot = StorageSlot::new(storage.clone(), profile.storage_key.clone());
    let mut lexicon =
        Lexicon::new(profile, slot).with_notifier(Arc::new(StorageMarker::new(storage)));
    lexicon.init()?;
    Ok(lexicon)
}

/// Truncate to `max_chars` characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Render entries as a table, TSV or JSON
pub fn render_entries(entries: &[Entry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(entries).into_diagnostic(),
        OutputFormat::Tsv => Ok(entries
            .iter()
            .map(|e| {
                format!(
                    "{}\t{}\t{}\t{}\t{}",
                    e.id,
                    e.headword,
                    e.gloss,
                    e.word_class.as_deref().unwrap_or(""),
                    e.dialect
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Auto | OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["ID", "Emakhua", "Português", "Classe", "Tom", "Dialeto", "✓"]);
            for e in entries {
                builder.push_record([
                    e.id.to_string(),
                    e.headword.clone(),
                    truncate_str(&e.gloss, 40),
                    e.word_class.clone().unwrap_or_default(),
                    e.tone.clone().unwrap_or_default(),
                    e.dialect.clone(),
                    if e.verified { "✓" } else { "" }.to_string(),
                ]);
            }
            let mut table = builder.build();
            if format == OutputFormat::Md {
                table.with(Style::markdown());
            } else {
                table.with(Style::rounded());
            }
            Ok(table.to_string())
        }
    }
}
