//! Lexicon schema and profile presets

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::types::EntryField;
use crate::core::storage::{SHARED_DB_KEY, STANDARD_DB_KEY};

/// Schema version recorded in `lexicon_meta` and in portable exports
pub const SCHEMA_VERSION: &str = "2.0";

/// Scope of the headword uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniquenessScope {
    /// One entry per headword
    #[default]
    Global,
    /// One entry per (headword, dialect)
    #[serde(rename = "dialect")]
    PerDialect,
}

/// What `remove` does to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Delete the row; associations and counters cascade
    Hard,
    /// Mark the row inactive
    Soft,
}

/// Configuration that distinguishes the single-page store from the shared one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProfile {
    pub name: &'static str,
    pub storage_key: String,
    pub uniqueness: UniquenessScope,
    pub delete_policy: DeletePolicy,
    pub default_verified: bool,
    /// Hide inactive entries from search and statistics
    pub active_only: bool,
    /// Columns `update` may touch; anything else in a patch is ignored
    pub updatable: Vec<EntryField>,
    /// Number of sample entries inserted on first init
    pub sample_entries: usize,
}

impl SchemaProfile {
    /// Single-page store
    pub fn standard() -> Self {
        Self {
            name: "full",
            storage_key: STANDARD_DB_KEY.to_string(),
            uniqueness: UniquenessScope::Global,
            delete_policy: DeletePolicy::Hard,
            default_verified: false,
            active_only: false,
            updatable: EntryField::ALL.to_vec(),
            sample_entries: 3,
        }
    }

    /// Store shared between pages, with soft deletes
    pub fn shared() -> Self {
        Self {
            name: "shared",
            storage_key: SHARED_DB_KEY.to_string(),
            uniqueness: UniquenessScope::Global,
            delete_policy: DeletePolicy::Soft,
            default_verified: true,
            active_only: true,
            updatable: EntryField::ALL.to_vec(),
            sample_entries: 5,
        }
    }

    pub fn with_uniqueness(mut self, scope: UniquenessScope) -> Self {
        self.uniqueness = scope;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Seed categories only
    pub fn without_samples(mut self) -> Self {
        self.sample_entries = 0;
        self
    }

    pub fn allows(&self, field: EntryField) -> bool {
        self.updatable.contains(&field)
    }
}

/// Create every table and index that doesn't exist yet
///
/// Safe to run against a restored snapshot; existing tables keep the
/// constraints they were created with.
pub(super) fn create_schema(conn: &Connection, profile: &SchemaProfile) -> rusqlite::Result<()> {
    let unique_columns = match profile.uniqueness {
        UniquenessScope::Global => "headword",
        UniquenessScope::PerDialect => "headword, dialect",
    };
    // Soft-deleted rows don't hold on to their headword
    let unique_scope = match profile.delete_policy {
        DeletePolicy::Hard => "",
        DeletePolicy::Soft => " WHERE active = 1",
    };

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS lexicon_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            headword TEXT NOT NULL,
            gloss TEXT NOT NULL,
            word_class TEXT,
            tone TEXT,
            dialect TEXT NOT NULL DEFAULT 'padrão',
            example_source TEXT,
            example_target TEXT,
            notes TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT DEFAULT 'admin',
            active INTEGER NOT NULL DEFAULT 1,
            verified INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_unique_headword
            ON entries({unique_columns}){unique_scope};
        CREATE INDEX IF NOT EXISTS idx_entries_headword ON entries(headword);
        CREATE INDEX IF NOT EXISTS idx_entries_gloss ON entries(gloss);
        CREATE INDEX IF NOT EXISTS idx_entries_word_class ON entries(word_class);
        CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            icon TEXT,
            color TEXT DEFAULT '#667eea',
            display_order INTEGER DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS entry_categories (
            entry_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            PRIMARY KEY (entry_id, category_id),
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS synonyms (
            entry_id INTEGER NOT NULL,
            synonym_id INTEGER NOT NULL,
            kind TEXT DEFAULT 'sinonimo',
            PRIMARY KEY (entry_id, synonym_id),
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
            FOREIGN KEY (synonym_id) REFERENCES entries(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS audio_assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL,
            kind TEXT DEFAULT 'pronuncia',
            filename TEXT NOT NULL,
            duration_secs REAL,
            quality TEXT DEFAULT 'alta',
            dialect TEXT,
            uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS usage_stats (
            entry_id INTEGER PRIMARY KEY,
            searches INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            last_search DATETIME,
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
        );
        "#
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO lexicon_meta (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO lexicon_meta (key, value) VALUES ('profile', ?1)",
        params![profile.name],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_create_schema_is_idempotent() {
        let conn = engine::open_blank().unwrap();
        create_schema(&conn, &SchemaProfile::standard()).unwrap();
        create_schema(&conn, &SchemaProfile::standard()).unwrap();

        let tables = table_names(&conn);
        for t in [
            "audio_assets",
            "categories",
            "entries",
            "entry_categories",
            "lexicon_meta",
            "synonyms",
            "usage_stats",
        ] {
            assert!(tables.contains(&t.to_string()), "missing table {}", t);
        }
    }

    #[test]
    fn test_dialect_scope_allows_same_headword_in_two_dialects() {
        let conn = engine::open_blank().unwrap();
        let profile = SchemaProfile::standard().with_uniqueness(UniquenessScope::PerDialect);
        create_schema(&conn, &profile).unwrap();

        conn.execute(
            "INSERT INTO entries (headword, gloss, dialect) VALUES ('muthu', 'pessoa', 'central')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO entries (headword, gloss, dialect) VALUES ('muthu', 'pessoa', 'litoral')",
            [],
        )
        .unwrap();
        assert!(conn
            .execute(
                "INSERT INTO entries (headword, gloss, dialect) VALUES ('muthu', 'gente', 'litoral')",
                [],
            )
            .is_err());
    }

    #[test]
    fn test_soft_delete_frees_headword() {
        let conn = engine::open_blank().unwrap();
        create_schema(&conn, &SchemaProfile::shared()).unwrap();

        conn.execute("INSERT INTO entries (headword, gloss) VALUES ('muti', 'árvore')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO entries (headword, gloss) VALUES ('muti', 'pau')", [])
            .is_err());

        conn.execute("UPDATE entries SET active = 0 WHERE headword = 'muti'", [])
            .unwrap();
        conn.execute("INSERT INTO entries (headword, gloss) VALUES ('muti', 'pau')", [])
            .unwrap();
    }

    #[test]
    fn test_hard_delete_profile_keeps_inactive_headwords_unique() {
        let conn = engine::open_blank().unwrap();
        create_schema(&conn, &SchemaProfile::standard()).unwrap();

        conn.execute(
            "INSERT INTO entries (headword, gloss, active) VALUES ('muti', 'árvore', 0)",
            [],
        )
        .unwrap();
        assert!(conn
            .execute("INSERT INTO entries (headword, gloss) VALUES ('muti', 'pau')", [])
            .is_err());
    }

    #[test]
    fn test_presets() {
        let standard = SchemaProfile::standard();
        let shared = SchemaProfile::shared();
        assert_eq!(standard.storage_key, STANDARD_DB_KEY);
        assert_eq!(shared.storage_key, SHARED_DB_KEY);
        assert_eq!(standard.delete_policy, DeletePolicy::Hard);
        assert_eq!(shared.delete_policy, DeletePolicy::Soft);
        assert!(shared.default_verified && !standard.default_verified);
        assert!(shared.active_only && !standard.active_only);
    }
}
