//! `emakhua db` commands - inspect and maintain converted database files

use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ingest::{self, Tally, DEFAULT_OUTPUT};

#[derive(clap::Subcommand, Debug)]
pub enum DbCommands {
    /// Show counts and distributions of a converted database
    Stats {
        /// Database file
        #[arg(default_value = DEFAULT_OUTPUT)]
        path: PathBuf,
    },
    /// Vacuum, reindex and analyze a converted database
    Optimize {
        /// Database file
        #[arg(default_value = DEFAULT_OUTPUT)]
        path: PathBuf,
    },
}

fn tally_table(header: &str, tallies: &[Tally], format: OutputFormat) -> String {
    let mut builder = Builder::default();
    builder.push_record([header, "Total"]);
    for tally in tallies {
        builder.push_record([
            tally.label.clone().unwrap_or_else(|| "-".to_string()),
            tally.total.to_string(),
        ]);
    }
    let mut table = builder.build();
    if format == OutputFormat::Md {
        table.with(Style::markdown());
    } else {
        table.with(Style::rounded());
    }
    table.to_string()
}

pub fn run(cmd: DbCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DbCommands::Stats { path } => {
            let summary = ingest::summarize(&path)?;

            if global.format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary.stats).unwrap_or_default()
                );
                return Ok(());
            }

            let stats = &summary.stats;
            println!("{}", style(path.display()).bold());
            println!("  words:      {}", style(stats.entries).cyan());
            println!("  variants:   {}", stats.variants);
            println!("  categories: {}", stats.categories);
            println!("  meanings:   {}", stats.meanings);
            println!("  examples:   {}", stats.examples);
            println!("  size:       {:.2} MB", stats.file_size_mb());
            for (key, value) in &summary.config {
                println!("  {:<11} {}", format!("{}:", key), value.as_deref().unwrap_or("-"));
            }

            if !summary.by_class.is_empty() {
                println!();
                println!("{}", tally_table("Classe", &summary.by_class, global.format));
            }
            if !summary.top_categories.is_empty() {
                println!();
                println!("{}", tally_table("Categoria", &summary.top_categories, global.format));
            }
        }
        DbCommands::Optimize { path } => {
            let size = ingest::optimize(&path)?;
            if !global.quiet {
                println!(
                    "{} Optimized {} ({:.2} MB)",
                    style("✓").green(),
                    style(path.display()).cyan(),
                    size as f64 / 1024.0 / 1024.0
                );
            }
        }
    }
    Ok(())
}
