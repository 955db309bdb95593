//! Lexicon mutations
//!
//! Each successful mutation persists the database before returning.

use rusqlite::{params, Connection};
use tracing::{info, warn};

use super::{
    DeletePolicy, EntryField, EntryPatch, FieldValue, Lexicon, NewEntry, StoreError,
    DEFAULT_DIALECT,
};

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub(super) fn required<'a>(value: &'a str, field: EntryField) -> Result<&'a str, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Validation(format!(
            "Missing required field: {}",
            field.name()
        )));
    }
    Ok(value)
}

/// Attach categories to an entry; unknown category ids are a constraint error
pub(super) fn attach_categories(
    conn: &Connection,
    entry_id: i64,
    category_ids: &[i64],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO entry_categories (entry_id, category_id) VALUES (?1, ?2)",
    )?;
    for category_id in category_ids {
        stmt.execute(params![entry_id, category_id])?;
    }
    Ok(())
}

impl Lexicon {
    /// Add an entry and return its id
    ///
    /// Headword and gloss are required. A duplicate headword (or headword
    /// and dialect, depending on the profile) is a [`StoreError::Constraint`].
    pub fn add_entry(&mut self, entry: &NewEntry) -> Result<i64, StoreError> {
        let headword = required(&entry.headword, EntryField::Headword)?;
        let gloss = required(&entry.gloss, EntryField::Gloss)?;
        let dialect = non_empty(&entry.dialect).unwrap_or(DEFAULT_DIALECT);
        let verified = entry.verified.unwrap_or(self.profile.default_verified);

        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (headword, gloss, word_class, tone, dialect,
                                  example_source, example_target, notes, verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                headword,
                gloss,
                non_empty(&entry.word_class),
                non_empty(&entry.tone),
                dialect,
                non_empty(&entry.example_source),
                non_empty(&entry.example_target),
                non_empty(&entry.notes),
                i64::from(verified),
            ],
        )?;
        let id = tx.last_insert_rowid();
        attach_categories(&tx, id, &entry.categories)?;
        tx.commit()?;

        info!(id, headword, "added entry");
        self.persist();
        Ok(id)
    }

    /// Apply a partial update to an entry
    ///
    /// Fields the profile doesn't allow are dropped. If the patch carries a
    /// category list, it replaces the entry's categories. `updated_at` is
    /// always refreshed.
    pub fn update(&mut self, id: i64, patch: &EntryPatch) -> Result<(), StoreError> {
        let fields: Vec<&(EntryField, FieldValue)> = patch
            .fields()
            .filter(|(field, _)| self.profile.allows(*field))
            .collect();

        if fields.is_empty() && patch.category_ids().is_none() {
            return Err(StoreError::Validation(
                "No valid fields to update".to_string(),
            ));
        }

        let mut sql = String::from("UPDATE entries SET ");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        for (field, value) in &fields {
            match value {
                FieldValue::Flag(flag) if field.is_flag() => {
                    params_vec.push(Box::new(i64::from(*flag)));
                }
                FieldValue::Text(text) if !field.is_flag() => {
                    let text = match text {
                        Some(t) if field.is_required() => Some(required(t, *field)?.to_string()),
                        None if field.is_required() => {
                            return Err(StoreError::Validation(format!(
                                "Missing required field: {}",
                                field.name()
                            )));
                        }
                        other => other.clone(),
                    };
                    params_vec.push(Box::new(text));
                }
                _ => {
                    return Err(StoreError::Validation(format!(
                        "Invalid value for field: {}",
                        field.name()
                    )));
                }
            }
            sql.push_str(field.column());
            sql.push_str(" = ?, ");
        }
        sql.push_str("updated_at = CURRENT_TIMESTAMP WHERE id = ?");
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(&sql, params_refs.as_slice())?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        if let Some(category_ids) = patch.category_ids() {
            tx.execute(
                "DELETE FROM entry_categories WHERE entry_id = ?1",
                params![id],
            )?;
            attach_categories(&tx, id, category_ids)?;
        }
        tx.commit()?;

        info!(id, fields = fields.len(), "updated entry");
        self.persist();
        Ok(())
    }

    /// Remove an entry according to the profile's delete policy
    pub fn remove(&mut self, id: i64) -> Result<(), StoreError> {
        let policy = self.profile.delete_policy;
        let conn = self.conn_mut()?;
        let changed = match policy {
            DeletePolicy::Hard => conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?,
            DeletePolicy::Soft => conn.execute(
                "UPDATE entries SET active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
                params![id],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        info!(id, ?policy, "removed entry");
        self.persist();
        Ok(())
    }

    /// Count a search hit for an entry
    ///
    /// Best effort: failures are logged and otherwise ignored.
    pub fn record_search_hit(&mut self, id: i64) {
        let Ok(conn) = self.conn() else {
            return;
        };

        let result = conn.execute(
            "INSERT INTO usage_stats (entry_id, searches, last_search)
             VALUES (?1, 1, CURRENT_TIMESTAMP)
             ON CONFLICT(entry_id) DO UPDATE SET
                 searches = searches + 1,
                 last_search = CURRENT_TIMESTAMP",
            params![id],
        );

        match result {
            Ok(_) => self.persist(),
            Err(e) => warn!(id, error = %e, "failed to record search hit"),
        }
    }
}
