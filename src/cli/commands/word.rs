//! Word commands: `add`, `search`, `show`, `update`, `remove`

use console::style;
use miette::{bail, IntoDiagnostic, Result};

use crate::cli::helpers::{open_lexicon, render_entries, yes_no};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lexicon::{
    Category, Entry, EntryPatch, Lexicon, NewEntry, SearchDirection, SearchFilter, StoreError,
};

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Emakhua headword
    pub headword: String,

    /// Portuguese gloss
    pub gloss: String,

    /// Grammatical class (e.g. substantivo, verbo)
    #[arg(long = "class", short = 'c')]
    pub word_class: Option<String>,

    /// Tone marking
    #[arg(long)]
    pub tone: Option<String>,

    /// Dialect (default: padrão)
    #[arg(long, short = 'd')]
    pub dialect: Option<String>,

    /// Example sentence in Emakhua
    #[arg(long)]
    pub example: Option<String>,

    /// Portuguese translation of the example
    #[arg(long)]
    pub translation: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Mark the word as verified (default depends on the profile)
    #[arg(long, conflicts_with = "unverified")]
    pub verified: bool,

    /// Mark the word as not verified
    #[arg(long)]
    pub unverified: bool,

    /// Category name or id (repeatable)
    #[arg(long = "category", short = 't')]
    pub categories: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum DirectionArg {
    /// Match Emakhua headwords
    Emakhua,
    /// Match Portuguese glosses
    Portugues,
}

impl From<DirectionArg> for SearchDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Emakhua => SearchDirection::EmakhuaToPortuguese,
            DirectionArg::Portugues => SearchDirection::PortugueseToEmakhua,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in headwords and glosses (omit to list everything)
    pub term: Option<String>,

    /// Only this grammatical class
    #[arg(long = "class", short = 'c')]
    pub word_class: Option<String>,

    /// Only this dialect
    #[arg(long, short = 'd')]
    pub dialect: Option<String>,

    /// Only verified words
    #[arg(long)]
    pub verified: bool,

    /// Search one side only (verified words, prefix or substring match)
    #[arg(long, value_enum)]
    pub direction: Option<DirectionArg>,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Word id
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Word id
    pub id: i64,

    /// Field assignment such as `portugues=casa` or `verificada=1` (repeatable)
    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE")]
    pub assignments: Vec<String>,

    /// JSON object of field changes
    #[arg(long, conflicts_with = "assignments")]
    pub json: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Word id
    pub id: i64,
}

/// Resolve category names or ids against the store
fn resolve_categories(lexicon: &Lexicon, wanted: &[String]) -> Result<Vec<i64>> {
    if wanted.is_empty() {
        return Ok(vec![]);
    }
    let known = lexicon.categories();
    let mut ids = Vec::with_capacity(wanted.len());
    for item in wanted {
        if let Ok(id) = item.trim().parse::<i64>() {
            ids.push(id);
            continue;
        }
        let needle = item.trim().to_lowercase();
        match known.iter().find(|c: &&Category| c.name.to_lowercase() == needle) {
            Some(category) => ids.push(category.id),
            None => bail!("Unknown category '{}'", item),
        }
    }
    Ok(ids)
}

pub fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut lexicon = open_lexicon(global)?;
    let categories = resolve_categories(&lexicon, &args.categories)?;

    let mut entry = NewEntry::new(args.headword, args.gloss).categories(categories);
    entry.word_class = args.word_class;
    entry.tone = args.tone;
    entry.dialect = args.dialect;
    entry.example_source = args.example;
    entry.example_target = args.translation;
    entry.notes = args.notes;
    if args.verified {
        entry.verified = Some(true);
    } else if args.unverified {
        entry.verified = Some(false);
    }

    let id = lexicon.add_entry(&entry)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
        OutputFormat::Tsv => println!("{}", id),
        _ if global.quiet => println!("{}", id),
        _ => println!(
            "{} Added {} ({})",
            style("✓").green(),
            style(entry.headword.trim()).cyan(),
            id
        ),
    }
    Ok(())
}

pub fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let lexicon = open_lexicon(global)?;

    let entries: Vec<Entry> = match args.direction {
        Some(direction) => {
            let Some(term) = args.term.as_deref() else {
                bail!("--direction needs a search term");
            };
            let mut found = lexicon.search_direction(term, direction.into());
            found.truncate(args.limit);
            found
        }
        None => {
            let mut filter = SearchFilter::default().limit(args.limit);
            if let Some(term) = args.term {
                filter = filter.term(term);
            }
            if let Some(class) = args.word_class {
                filter = filter.word_class(class);
            }
            if let Some(dialect) = args.dialect {
                filter = filter.dialect(dialect);
            }
            if args.verified {
                filter = filter.verified(true);
            }
            lexicon.search(&filter)
        }
    };

    if entries.is_empty() && global.format == OutputFormat::Auto {
        if !global.quiet {
            println!("No words found.");
        }
        return Ok(());
    }

    println!("{}", render_entries(&entries, global.format)?);
    if global.format == OutputFormat::Auto && !global.quiet {
        println!("{} word(s)", style(entries.len()).cyan());
    }
    Ok(())
}

pub fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut lexicon = open_lexicon(global)?;
    let Some(entry) = lexicon.get_by_id(args.id) else {
        return Err(StoreError::NotFound(args.id).into());
    };
    lexicon.record_search_hit(args.id);

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entry).into_diagnostic()?);
        return Ok(());
    }

    println!("{} {}", style(&entry.headword).bold(), style(format!("#{}", entry.id)).dim());
    println!("  {}", entry.gloss);
    let optional = [
        ("classe", &entry.word_class),
        ("tom", &entry.tone),
        ("exemplo", &entry.example_source),
        ("tradução", &entry.example_target),
        ("notas", &entry.notes),
    ];
    println!("  {:<10} {}", "dialeto", entry.dialect);
    for (label, value) in optional {
        if let Some(value) = value {
            println!("  {:<10} {}", label, value);
        }
    }
    println!("  {:<10} {}", "verificada", yes_no(entry.verified));
    if !entry.active {
        println!("  {:<10} {}", "ativa", style("no").red());
    }
    if !entry.categories.is_empty() {
        let names: Vec<&str> = entry.categories.iter().map(|c| c.name.as_str()).collect();
        println!("  {:<10} {}", "categorias", names.join(", "));
    }
    println!("  {:<10} {}", "cadastro", entry.created_at);
    if let Some(usage) = lexicon.usage(args.id) {
        println!("  {:<10} {}", "consultas", usage.searches);
    }
    Ok(())
}

pub fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = match args.json {
        Some(ref json) => {
            let value: serde_json::Value = serde_json::from_str(json).into_diagnostic()?;
            EntryPatch::from_json(&value)?
        }
        None => {
            let mut pairs = Vec::with_capacity(args.assignments.len());
            for assignment in &args.assignments {
                let Some((field, value)) = assignment.split_once('=') else {
                    bail!("Expected FIELD=VALUE, got '{}'", assignment);
                };
                pairs.push((field.trim(), value.trim()));
            }
            EntryPatch::from_pairs(pairs)?
        }
    };

    let mut lexicon = open_lexicon(global)?;
    lexicon.update(args.id, &patch)?;

    if !global.quiet {
        println!("{} Updated word {}", style("✓").green(), args.id);
    }
    Ok(())
}

pub fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let mut lexicon = open_lexicon(global)?;
    lexicon.remove(args.id)?;

    if !global.quiet {
        println!("{} Removed word {}", style("✓").green(), args.id);
    }
    Ok(())
}
