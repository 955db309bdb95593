//! JSON corpus to SQLite converter
//!
//! Reads a denormalized word corpus and writes a fresh, normalized SQLite
//! database file: entries, per-variant data, ordered meanings and examples.
//! All words are inserted in one transaction. Each word runs inside its own
//! savepoint, so a word that fails leaves no partial rows; whether the run
//! then skips it or aborts is the [`ErrorPolicy`].

mod corpus;
mod report;
mod schema;

pub use corpus::{Corpus, ExamplePair, Meaning, VariantData, WordRecord};
pub use report::{summarize, ConversionStats, DatabaseSummary, IngestReport, SkippedWord, Tally};
pub use schema::{ALL_VARIANTS, VARIANTS};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use corpus::present;

/// Default corpus location
pub const DEFAULT_INPUT: &str = "./dicionario_original.json";

/// Default output database
pub const DEFAULT_OUTPUT: &str = "./data/dicionario.db";

/// Words between progress reports
pub const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("File not found: {}", .path.display())]
    #[diagnostic(code(emakhua::ingest::not_found))]
    NotFound { path: PathBuf },

    #[error("Invalid corpus JSON in {}: {source}", .path.display())]
    #[diagnostic(code(emakhua::ingest::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A word failed and the policy is [`ErrorPolicy::Abort`]
    #[error("Word {} ({}) failed: {reason}", .index + 1, .headword.as_deref().unwrap_or("?"))]
    #[diagnostic(
        code(emakhua::ingest::record),
        help("run without --strict to skip failing words")
    )]
    Record {
        index: usize,
        headword: Option<String>,
        reason: String,
    },

    #[error("Database error: {0}")]
    #[diagnostic(code(emakhua::ingest::database))]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(emakhua::ingest::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to write statistics: {0}")]
    #[diagnostic(code(emakhua::ingest::stats))]
    Stats(#[source] serde_json::Error),
}

/// What to do when one word can't be inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the word, leave it out, keep going
    #[default]
    SkipRecord,
    /// Stop and roll back everything
    Abort,
}

/// Why a single word failed
#[derive(Debug, Error)]
enum WordError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing palavra_emakhua")]
    MissingHeadword,
    #[error("{0}")]
    Engine(#[from] rusqlite::Error),
}

/// Lookup maps built from the seeded reference tables
struct ReferenceMaps {
    /// variant code -> id
    variants: HashMap<String, i64>,
    /// lowercase category name -> canonical name
    categories: HashMap<String, String>,
}

impl ReferenceMaps {
    fn load(conn: &Connection) -> rusqlite::Result<Self> {
        let mut stmt = conn.prepare("SELECT id, code FROM variants")?;
        let variants = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        let mut stmt = conn.prepare("SELECT name FROM categories")?;
        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .map(|name| (name.to_lowercase(), name))
            .collect();

        Ok(Self {
            variants,
            categories,
        })
    }

    fn canonical_category<'a>(&'a self, name: &'a str) -> &'a str {
        self.categories
            .get(&name.to_lowercase())
            .map(String::as_str)
            .unwrap_or(name)
    }
}

/// Converts a corpus file into a SQLite database file
pub struct Converter {
    policy: ErrorPolicy,
    progress: Option<Box<dyn FnMut(usize, usize)>>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ErrorPolicy::default())
    }
}

impl Converter {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            progress: None,
        }
    }

    /// Called with (words done, total words) every [`PROGRESS_EVERY`] words
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, usize) + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// Read `input` and write a fresh database to `output`
    pub fn convert(&mut self, input: &Path, output: &Path) -> Result<IngestReport, IngestError> {
        let corpus = read_corpus(input)?;
        info!(words = corpus.words.len(), input = %input.display(), "converting corpus");

        let mut conn = create_database(output)?;
        let maps = ReferenceMaps::load(&conn)?;

        let (processed, skipped) = self.insert_words(&mut conn, &maps, &corpus.words)?;

        debug!("optimizing output database");
        conn.execute_batch("VACUUM; ANALYZE; PRAGMA optimize;")?;

        let mut stats = ConversionStats::count(&conn)?;
        conn.execute(
            "UPDATE config SET value = ?1 WHERE key = 'total_palavras'",
            params![stats.entries.to_string()],
        )?;
        conn.execute(
            "UPDATE config SET value = datetime('now') WHERE key = 'ultima_atualizacao'",
            [],
        )?;
        drop(conn);

        stats.file_size = fs::metadata(output)?.len();
        let stats_path = stats_path_for(output);
        let json = serde_json::to_string_pretty(&stats).map_err(IngestError::Stats)?;
        fs::write(&stats_path, json)?;

        info!(processed, skipped = skipped.len(), "conversion finished");
        Ok(IngestReport {
            processed,
            skipped,
            stats,
            stats_path,
        })
    }

    fn insert_words(
        &mut self,
        conn: &mut Connection,
        maps: &ReferenceMaps,
        words: &[JsonValue],
    ) -> Result<(usize, Vec<SkippedWord>), IngestError> {
        let total = words.len();
        let mut processed = 0;
        let mut skipped = Vec::new();

        let mut tx = conn.transaction()?;
        for (index, value) in words.iter().enumerate() {
            let sp = tx.savepoint()?;
            match insert_word(&sp, maps, value) {
                Ok(()) => {
                    sp.commit()?;
                    processed += 1;
                }
                Err(e) => {
                    // Dropping the savepoint rolls the word back
                    drop(sp);
                    let headword = value
                        .get("palavra_emakhua")
                        .and_then(JsonValue::as_str)
                        .map(String::from);
                    if self.policy == ErrorPolicy::Abort {
                        return Err(IngestError::Record {
                            index,
                            headword,
                            reason: e.to_string(),
                        });
                    }
                    warn!(word = index + 1, error = %e, "skipping word");
                    skipped.push(SkippedWord {
                        index,
                        headword,
                        reason: e.to_string(),
                    });
                }
            }

            if (index + 1) % PROGRESS_EVERY == 0 {
                debug!(done = index + 1, total, "converting");
                if let Some(progress) = self.progress.as_mut() {
                    progress(index + 1, total);
                }
            }
        }
        tx.commit()?;

        Ok((processed, skipped))
    }
}

/// Convert with the default policy
pub fn convert(input: &Path, output: &Path) -> Result<IngestReport, IngestError> {
    Converter::default().convert(input, output)
}

fn read_corpus(input: &Path) -> Result<Corpus, IngestError> {
    if !input.exists() {
        return Err(IngestError::NotFound {
            path: input.to_path_buf(),
        });
    }
    let content = fs::read_to_string(input)?;
    serde_json::from_str(&content).map_err(|source| IngestError::Parse {
        path: input.to_path_buf(),
        source,
    })
}

fn create_database(output: &Path) -> Result<Connection, IngestError> {
    if output.exists() {
        fs::remove_file(output)?;
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(output)?;
    schema::create_schema(&conn)?;
    Ok(conn)
}

/// `dir/name.db` -> `dir/name_stats.json`
pub fn stats_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicionario".to_string());
    output.with_file_name(format!("{}_stats.json", stem))
}

fn insert_word(conn: &Connection, maps: &ReferenceMaps, value: &JsonValue) -> Result<(), WordError> {
    let word = WordRecord::from_value(value)?;
    let headword = present(&word.headword).ok_or(WordError::MissingHeadword)?;
    let category = present(&word.category).map(|c| maps.canonical_category(c));

    conn.execute(
        "INSERT INTO entries (headword, word_class, category, gender, number, frequency, observations)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            headword,
            word.word_class,
            category,
            present(&word.gender),
            present(&word.number),
            present(&word.frequency).unwrap_or("média"),
            present(&word.observations),
        ],
    )?;
    let entry_id = conn.last_insert_rowid();

    for (code, variant) in &word.variants {
        let Some(&variant_id) = maps.variants.get(code) else {
            debug!(code = %code, headword, "unknown variant code");
            continue;
        };
        if code == ALL_VARIANTS {
            continue;
        }

        let conjugation = variant
            .conjugation
            .as_ref()
            .filter(|c| !c.is_null())
            .map(JsonValue::to_string);
        conn.execute(
            "INSERT OR IGNORE INTO entry_variants (entry_id, variant_id, pronunciation, tone, plural, conjugation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry_id,
                variant_id,
                present(&variant.pronunciation),
                present(&variant.tone),
                present(&variant.plural),
                conjugation,
            ],
        )?;

        for (position, meaning) in variant.meanings.iter().enumerate() {
            conn.execute(
                "INSERT INTO meanings (entry_id, variant_id, position, definition_source, definition_target, context, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry_id,
                    variant_id,
                    position as i64 + 1,
                    present(&meaning.definition_source).unwrap_or(""),
                    present(&meaning.definition_target),
                    present(&meaning.context),
                    present(&meaning.notes),
                ],
            )?;
            let meaning_id = conn.last_insert_rowid();

            let Some(examples) = meaning.examples.as_ref() else {
                continue;
            };
            if let Some(text) = present(&examples.emakhua) {
                conn.execute(
                    "INSERT INTO examples (meaning_id, side, text, translation) VALUES (?1, 'emakhua', ?2, ?3)",
                    params![meaning_id, text, present(&examples.portugues)],
                )?;
            }
            if let Some(text) = present(&examples.portugues) {
                conn.execute(
                    "INSERT INTO examples (meaning_id, side, text) VALUES (?1, 'portugues', ?2)",
                    params![meaning_id, text],
                )?;
            }
        }
    }

    Ok(())
}

/// Compact and re-analyze a converted database; returns its size in bytes
pub fn optimize(path: &Path) -> Result<u64, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("VACUUM; REINDEX; ANALYZE; PRAGMA optimize;")?;
    let size: i64 = conn.query_row(
        "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        [],
        |row| row.get(0),
    )?;
    info!(path = %path.display(), size, "optimized database");
    Ok(size.max(0) as u64)
}
