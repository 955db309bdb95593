//! Portable JSON interchange format
//!
//! A self-describing document with all entries (including inactive ones and
//! their category links), all categories and some metadata. Importing a
//! document replaces the whole lexicon in one transaction.

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::mutations::{attach_categories, required};
use super::{Category, Entry, EntryField, Lexicon, StoreError, SCHEMA_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortableMetadata {
    #[serde(rename = "versao")]
    pub version: String,
    #[serde(rename = "data_exportacao")]
    pub exported_at: String,
    #[serde(rename = "total_palavras")]
    pub total_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortableDocument {
    #[serde(rename = "palavras")]
    pub entries: Vec<Entry>,
    #[serde(rename = "categorias", default)]
    pub categories: Vec<Category>,
    #[serde(rename = "metadados", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PortableMetadata>,
}

impl Lexicon {
    /// Build the portable document for the current lexicon
    pub fn portable_document(&self) -> Result<PortableDocument, StoreError> {
        self.conn()?;
        let entries = self.every_entry();
        Ok(PortableDocument {
            metadata: Some(PortableMetadata {
                version: SCHEMA_VERSION.to_string(),
                exported_at: Utc::now().to_rfc3339(),
                total_entries: entries.len(),
            }),
            categories: self.categories(),
            entries,
        })
    }

    /// Export the lexicon as pretty-printed portable JSON
    pub fn export_portable(&self) -> Result<String, StoreError> {
        let doc = self.portable_document()?;
        serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::Validation(format!("Failed to serialize lexicon: {}", e)))
    }

    /// Replace the lexicon with the contents of a portable JSON document
    ///
    /// Either every record is imported or nothing changes.
    pub fn import_portable(&mut self, json: &str) -> Result<usize, StoreError> {
        let doc: PortableDocument = serde_json::from_str(json).map_err(|e| {
            StoreError::Validation(format!("Malformed portable document: {}", e))
        })?;
        self.import_document(&doc)
    }

    /// Replace the lexicon with an already parsed document
    pub fn import_document(&mut self, doc: &PortableDocument) -> Result<usize, StoreError> {
        for (index, entry) in doc.entries.iter().enumerate() {
            required(&entry.headword, EntryField::Headword)
                .and_then(|_| required(&entry.gloss, EntryField::Gloss))
                .map_err(|e| match e {
                    StoreError::Validation(reason) => {
                        StoreError::Validation(format!("Record {}: {}", index + 1, reason))
                    }
                    other => other,
                })?;
        }

        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let rollback = |e: rusqlite::Error| StoreError::Transaction {
            reason: e.to_string(),
        };

        tx.execute_batch(
            "DELETE FROM entry_categories;
             DELETE FROM usage_stats;
             DELETE FROM synonyms;
             DELETE FROM audio_assets;
             DELETE FROM entries;
             DELETE FROM categories;",
        )
        .map_err(rollback)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO categories (id, name, description, icon, color, display_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(rollback)?;
            for c in &doc.categories {
                stmt.execute(params![c.id, c.name, c.description, c.icon, c.color, c.order])
                    .map_err(rollback)?;
            }

            let mut stmt = tx
                .prepare(
                    "INSERT INTO entries (id, headword, gloss, word_class, tone, dialect,
                                          example_source, example_target, notes,
                                          created_at, updated_at, created_by, active, verified)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                             COALESCE(NULLIF(?10, ''), CURRENT_TIMESTAMP),
                             COALESCE(NULLIF(?11, ''), CURRENT_TIMESTAMP),
                             ?12, ?13, ?14)",
                )
                .map_err(rollback)?;
            for e in &doc.entries {
                stmt.execute(params![
                    e.id,
                    e.headword,
                    e.gloss,
                    e.word_class,
                    e.tone,
                    e.dialect,
                    e.example_source,
                    e.example_target,
                    e.notes,
                    e.created_at,
                    e.updated_at,
                    e.created_by,
                    i64::from(e.active),
                    i64::from(e.verified),
                ])
                .map_err(rollback)?;

                let ids: Vec<i64> = e.categories.iter().map(|c| c.id).collect();
                attach_categories(&tx, e.id, &ids).map_err(rollback)?;
            }
        }

        tx.commit().map_err(rollback)?;

        let imported = doc.entries.len();
        info!(entries = imported, categories = doc.categories.len(), "imported portable lexicon");
        self.persist();
        Ok(imported)
    }
}
