//! Conversion statistics and database summaries

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use super::schema::ALL_VARIANTS;
use super::IngestError;

/// Table counts written next to the output as `<stem>_stats.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    #[serde(rename = "total_palavras")]
    pub entries: i64,
    /// Excludes the "all variants" sentinel
    #[serde(rename = "total_variantes")]
    pub variants: i64,
    #[serde(rename = "total_categorias")]
    pub categories: i64,
    #[serde(rename = "total_significados")]
    pub meanings: i64,
    #[serde(rename = "total_exemplos")]
    pub examples: i64,
    /// Output file size in bytes
    #[serde(rename = "tamanho_arquivo")]
    pub file_size: u64,
}

impl ConversionStats {
    /// Count rows; `file_size` is left at zero
    pub fn count(conn: &Connection) -> rusqlite::Result<Self> {
        let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
        Ok(Self {
            entries: count("SELECT COUNT(*) FROM entries")?,
            variants: conn.query_row(
                "SELECT COUNT(*) FROM variants WHERE code != ?1",
                [ALL_VARIANTS],
                |row| row.get(0),
            )?,
            categories: count("SELECT COUNT(*) FROM categories")?,
            meanings: count("SELECT COUNT(*) FROM meanings")?,
            examples: count("SELECT COUNT(*) FROM examples")?,
            file_size: 0,
        })
    }

    pub fn file_size_mb(&self) -> f64 {
        self.file_size as f64 / 1024.0 / 1024.0
    }
}

/// A word the converter left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedWord {
    /// Zero-based position in the corpus
    pub index: usize,
    pub headword: Option<String>,
    pub reason: String,
}

/// Outcome of a conversion run
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub processed: usize,
    pub skipped: Vec<SkippedWord>,
    pub stats: ConversionStats,
    pub stats_path: PathBuf,
}

/// Label and row count, used for distributions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub label: Option<String>,
    pub total: i64,
}

/// Everything `db stats` reports about a converted database
#[derive(Debug, Clone)]
pub struct DatabaseSummary {
    pub stats: ConversionStats,
    pub by_class: Vec<Tally>,
    pub top_categories: Vec<Tally>,
    pub config: Vec<(String, Option<String>)>,
}

fn tallies(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<Tally>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(Tally {
            label: row.get(0)?,
            total: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Read counts, distributions and config rows from a converted database
pub fn summarize(path: &Path) -> Result<DatabaseSummary, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut stats = ConversionStats::count(&conn)?;
    stats.file_size = std::fs::metadata(path)?.len();

    let by_class = tallies(
        &conn,
        "SELECT word_class, COUNT(*) AS total FROM entries
         GROUP BY word_class ORDER BY total DESC, word_class",
    )?;
    let top_categories = tallies(
        &conn,
        "SELECT category, COUNT(*) AS total FROM entries
         WHERE category IS NOT NULL
         GROUP BY category ORDER BY total DESC, category LIMIT 10",
    )?;

    let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key")?;
    let config = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(DatabaseSummary {
        stats,
        by_class,
        top_categories,
        config,
    })
}
