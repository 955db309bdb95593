//! `emakhua stats` command - lexicon totals and distributions

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::open_lexicon;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Also list the most recently added words
    #[arg(long)]
    pub recent: bool,
}

pub fn run(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let lexicon = open_lexicon(global)?;
    let stats = lexicon.statistics();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            println!("total\t{}", stats.total);
            println!("verified\t{}", stats.verified);
            for class in &stats.by_class {
                println!("class:{}\t{}", class.class, class.total);
            }
        }
        OutputFormat::Auto | OutputFormat::Md => {
            println!("{}", style("Lexicon Statistics").bold());
            println!("  words:    {}", style(stats.total).cyan());
            println!("  verified: {}", style(stats.verified).green());

            if !stats.by_class.is_empty() {
                println!();
                let mut builder = Builder::default();
                builder.push_record(["Classe", "Total"]);
                for class in &stats.by_class {
                    builder.push_record([class.class.clone(), class.total.to_string()]);
                }
                let mut table = builder.build();
                if global.format == OutputFormat::Md {
                    table.with(Style::markdown());
                } else {
                    table.with(Style::rounded());
                }
                println!("{}", table);
            }

            if args.recent && !stats.recent.is_empty() {
                println!();
                println!("{}", style("Recent").bold());
                for recent in &stats.recent {
                    println!(
                        "  {} {} {}",
                        style(&recent.headword).cyan(),
                        recent.gloss,
                        style(&recent.created_at).dim()
                    );
                }
            }
        }
    }
    Ok(())
}
