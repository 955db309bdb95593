//! Normalized dictionary schema written by the converter

use rusqlite::{params, Connection};

use crate::core::lexicon::DEFAULT_CATEGORIES;

/// Schema version recorded in the `config` table
pub const SCHEMA_VERSION: &str = "1.0";

/// Sentinel variant meaning "applies to every variant"; never linked
pub const ALL_VARIANTS: &str = "all";

/// (code, name, region)
pub const VARIANTS: [(&str, &str, Option<&str>); 7] = [
    (ALL_VARIANTS, "Todas as variantes", None),
    ("central", "Emakhua central", Some("Nampula")),
    ("litoral", "Emakhua do litoral", Some("Costa de Nampula")),
    ("meetto", "Emeetto", Some("Cabo Delgado e Niassa")),
    ("marrevone", "Emarrevone", Some("Costa de Nampula")),
    ("enahara", "Enahara", Some("Ilha de Moçambique")),
    ("esaaka", "Esaaka", Some("Nacala")),
];

/// Create tables and seed reference data on a fresh database
pub(super) fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            region TEXT,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            icon TEXT,
            color TEXT DEFAULT '#667eea'
        );

        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            headword TEXT NOT NULL,
            word_class TEXT,
            category TEXT,
            gender TEXT,
            number TEXT,
            frequency TEXT DEFAULT 'média',
            observations TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_entries_headword ON entries(headword);
        CREATE INDEX IF NOT EXISTS idx_entries_word_class ON entries(word_class);
        CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category);
        CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);

        CREATE TABLE IF NOT EXISTS entry_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL,
            variant_id INTEGER NOT NULL,
            pronunciation TEXT,
            tone TEXT,
            plural TEXT,
            conjugation TEXT,
            UNIQUE (entry_id, variant_id),
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
            FOREIGN KEY (variant_id) REFERENCES variants(id)
        );

        CREATE TABLE IF NOT EXISTS meanings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL,
            variant_id INTEGER,
            position INTEGER NOT NULL DEFAULT 1,
            definition_source TEXT NOT NULL DEFAULT '',
            definition_target TEXT,
            context TEXT,
            notes TEXT,
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
            FOREIGN KEY (variant_id) REFERENCES variants(id)
        );
        CREATE INDEX IF NOT EXISTS idx_meanings_entry ON meanings(entry_id);

        CREATE TABLE IF NOT EXISTS examples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meaning_id INTEGER NOT NULL,
            side TEXT NOT NULL CHECK (side IN ('emakhua', 'portugues')),
            text TEXT NOT NULL,
            translation TEXT,
            notes TEXT,
            FOREIGN KEY (meaning_id) REFERENCES meanings(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_examples_meaning ON examples(meaning_id);

        CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        "#,
    )?;

    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO variants (code, name, region) VALUES (?1, ?2, ?3)")?;
    for (code, name, region) in VARIANTS {
        stmt.execute(params![code, name, region])?;
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO categories (name, description, icon, color) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (name, description, icon, color) in DEFAULT_CATEGORIES {
        stmt.execute(params![name, description, icon, color])?;
    }

    conn.execute(
        "INSERT OR IGNORE INTO config (key, value) VALUES ('versao_schema', ?1)",
        params![SCHEMA_VERSION],
    )?;
    conn.execute_batch(
        "INSERT OR IGNORE INTO config (key, value) VALUES ('total_palavras', '0');
         INSERT OR IGNORE INTO config (key, value) VALUES ('ultima_atualizacao', datetime('now'));",
    )?;

    Ok(())
}
