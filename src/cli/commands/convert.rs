//! `emakhua convert` command - build a SQLite database from the JSON corpus

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ingest::{Converter, ErrorPolicy, DEFAULT_INPUT, DEFAULT_OUTPUT};

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Corpus JSON file (object with a "palavras" array)
    #[arg(default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Output database file (replaced if it exists)
    #[arg(default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Abort on the first word that fails instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: ConvertArgs, global: &GlobalOpts) -> Result<()> {
    let policy = if args.strict {
        ErrorPolicy::Abort
    } else {
        ErrorPolicy::SkipRecord
    };

    let show_progress = !global.quiet && global.format != OutputFormat::Json;
    let mut converter = Converter::new(policy);
    if show_progress {
        converter = converter.on_progress(|done, total| {
            eprintln!("{} {}/{} words", style("→").blue(), done, total);
        });
    }

    let report = converter.convert(&args.input, &args.output)?;

    if global.format == OutputFormat::Json {
        let json = serde_json::json!({
            "processadas": report.processed,
            "ignoradas": report.skipped.len(),
            "estatisticas": report.stats,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    for skipped in &report.skipped {
        eprintln!(
            "{} word {} ({}) skipped: {}",
            style("!").yellow(),
            skipped.index + 1,
            skipped.headword.as_deref().unwrap_or("?"),
            skipped.reason
        );
    }

    if global.quiet {
        return Ok(());
    }

    let stats = &report.stats;
    println!(
        "{} Converted {} words into {}",
        style("✓").green(),
        style(report.processed).cyan(),
        style(args.output.display()).cyan()
    );
    println!("  variants:   {}", stats.variants);
    println!("  categories: {}", stats.categories);
    println!("  meanings:   {}", stats.meanings);
    println!("  examples:   {}", stats.examples);
    println!("  size:       {:.2} MB", stats.file_size_mb());
    if !report.skipped.is_empty() {
        println!("  skipped:    {}", style(report.skipped.len()).yellow());
    }
    println!(
        "{} Statistics written to {}",
        style("→").blue(),
        report.stats_path.display()
    );
    Ok(())
}
