//! Read-only lexicon queries
//!
//! Queries never fail: an uninitialized store or an engine error yields an
//! empty result, with the error logged.

use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use super::{
    Category, ClassCount, Entry, Lexicon, RecentEntry, SearchDirection, SearchFilter, Statistics,
    UsageStat,
};

pub(super) const ENTRY_COLUMNS: &str = "id, headword, gloss, word_class, tone, dialect, \
     example_source, example_target, notes, created_at, updated_at, created_by, active, verified";

const CATEGORY_COLUMNS: &str = "id, name, description, icon, color, display_order";

/// Number of entries listed in [`Statistics::recent`]
const RECENT_LIMIT: usize = 5;

/// Escape LIKE wildcards so the term matches literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub(super) fn entry_from_row(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        headword: row.get(1)?,
        gloss: row.get(2)?,
        word_class: row.get(3)?,
        tone: row.get(4)?,
        dialect: row.get(5)?,
        example_source: row.get(6)?,
        example_target: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        created_by: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        active: row.get::<_, i64>(12)? != 0,
        verified: row.get::<_, i64>(13)? != 0,
        categories: Vec::new(),
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        order: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
    })
}

impl Lexicon {
    /// Search entries; all filters are combined with AND
    ///
    /// Results are ordered by headword, case-insensitively.
    pub fn search(&self, filter: &SearchFilter) -> Vec<Entry> {
        let Ok(conn) = self.conn() else {
            return vec![];
        };

        let mut sql = format!("SELECT {} FROM entries WHERE 1=1", ENTRY_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if self.profile.active_only {
            sql.push_str(" AND active = 1");
        }

        if let Some(term) = filter.term.as_deref().filter(|t| !t.is_empty()) {
            sql.push_str(" AND (headword LIKE ? ESCAPE '\\' OR gloss LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(term);
            params_vec.push(Box::new(pattern.clone()));
            params_vec.push(Box::new(pattern));
        }

        if let Some(ref class) = filter.word_class {
            sql.push_str(" AND word_class = ?");
            params_vec.push(Box::new(class.clone()));
        }

        if let Some(ref dialect) = filter.dialect {
            sql.push_str(" AND dialect = ?");
            params_vec.push(Box::new(dialect.clone()));
        }

        if let Some(verified) = filter.verified {
            sql.push_str(" AND verified = ?");
            params_vec.push(Box::new(i64::from(verified)));
        }

        sql.push_str(" ORDER BY headword COLLATE NOCASE, id");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit as i64));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "search failed");
                return vec![];
            }
        };

        let rows = match stmt.query_map(params_refs.as_slice(), entry_from_row) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "search failed");
                return vec![];
            }
        };

        rows.filter_map(|r| r.ok()).collect()
    }

    /// Search one side of the pair only, among verified entries
    pub fn search_direction(&self, term: &str, direction: SearchDirection) -> Vec<Entry> {
        let Ok(conn) = self.conn() else {
            return vec![];
        };

        let column = match direction {
            SearchDirection::EmakhuaToPortuguese => "headword",
            SearchDirection::PortugueseToEmakhua => "gloss",
        };
        let active = if self.profile.active_only {
            " AND active = 1"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {} FROM entries WHERE {} LIKE ?1 ESCAPE '\\' AND verified = 1{} \
             ORDER BY {} COLLATE NOCASE, id",
            ENTRY_COLUMNS, column, active, column
        );

        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let rows = match stmt.query_map(params![like_pattern(term)], entry_from_row) {
            Ok(r) => r,
            Err(_) => return vec![],
        };

        rows.filter_map(|r| r.ok()).collect()
    }

    /// Get one entry with its categories
    pub fn get_by_id(&self, id: i64) -> Option<Entry> {
        let conn = self.conn().ok()?;
        let mut entry = conn
            .query_row(
                &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
                params![id],
                entry_from_row,
            )
            .optional()
            .ok()
            .flatten()?;

        entry.categories = self.entry_categories(id);
        Some(entry)
    }

    /// Categories attached to an entry, in display order
    pub fn entry_categories(&self, entry_id: i64) -> Vec<Category> {
        let Ok(conn) = self.conn() else {
            return vec![];
        };

        let mut stmt = match conn.prepare(
            "SELECT c.id, c.name, c.description, c.icon, c.color, c.display_order
             FROM categories c
             JOIN entry_categories ec ON ec.category_id = c.id
             WHERE ec.entry_id = ?1
             ORDER BY c.display_order, c.name",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let rows = match stmt.query_map(params![entry_id], category_from_row) {
            Ok(r) => r,
            Err(_) => return vec![],
        };

        rows.filter_map(|r| r.ok()).collect()
    }

    /// All categories, in display order
    pub fn categories(&self) -> Vec<Category> {
        let Ok(conn) = self.conn() else {
            return vec![];
        };

        let mut stmt = match conn.prepare(&format!(
            "SELECT {} FROM categories ORDER BY display_order, name",
            CATEGORY_COLUMNS
        )) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let rows = match stmt.query_map([], category_from_row) {
            Ok(r) => r,
            Err(_) => return vec![],
        };

        rows.filter_map(|r| r.ok()).collect()
    }

    /// Visible entries ordered by headword, with categories resolved
    pub fn all_entries(&self) -> Vec<Entry> {
        let visible = if self.profile.active_only {
            "WHERE active = 1"
        } else {
            ""
        };
        self.entries_with_categories(&format!(
            "SELECT {} FROM entries {} ORDER BY headword COLLATE NOCASE, id",
            ENTRY_COLUMNS, visible
        ))
    }

    /// Every entry including inactive ones, in id order
    pub(super) fn every_entry(&self) -> Vec<Entry> {
        self.entries_with_categories(&format!(
            "SELECT {} FROM entries ORDER BY id",
            ENTRY_COLUMNS
        ))
    }

    fn entries_with_categories(&self, sql: &str) -> Vec<Entry> {
        let Ok(conn) = self.conn() else {
            return vec![];
        };

        let mut stmt = match conn.prepare(sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let entries: Vec<Entry> = match stmt.query_map([], entry_from_row) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(_) => return vec![],
        };

        entries
            .into_iter()
            .map(|mut e| {
                e.categories = self.entry_categories(e.id);
                e
            })
            .collect()
    }

    /// Number of visible entries
    pub fn total_entries(&self) -> usize {
        let Ok(conn) = self.conn() else {
            return 0;
        };
        let sql = if self.profile.active_only {
            "SELECT COUNT(*) FROM entries WHERE active = 1"
        } else {
            "SELECT COUNT(*) FROM entries"
        };
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// Totals, per-class counts and the most recently added entries
    pub fn statistics(&self) -> Statistics {
        let Ok(conn) = self.conn() else {
            return Statistics::default();
        };

        let visible = if self.profile.active_only {
            "active = 1"
        } else {
            "1=1"
        };

        let count = |sql: &str| -> usize {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .unwrap_or(0)
        };

        let total = count(&format!("SELECT COUNT(*) FROM entries WHERE {}", visible));
        let verified = count(&format!(
            "SELECT COUNT(*) FROM entries WHERE {} AND verified = 1",
            visible
        ));

        let by_class: Vec<ClassCount> = match conn.prepare(&format!(
            "SELECT word_class, COUNT(*) FROM entries
             WHERE {} AND word_class IS NOT NULL AND word_class != ''
             GROUP BY word_class ORDER BY COUNT(*) DESC, word_class",
            visible
        )) {
            Ok(mut stmt) => stmt
                .query_map([], |row| {
                    Ok(ClassCount {
                        class: row.get(0)?,
                        total: row.get::<_, i64>(1)? as usize,
                    })
                })
                .map(|rows| rows.filter_map(|r| r.ok()).collect::<Vec<_>>())
                .unwrap_or_default(),
            Err(_) => vec![],
        };

        let recent: Vec<RecentEntry> = match conn.prepare(&format!(
            "SELECT headword, gloss, created_at FROM entries
             WHERE {} ORDER BY created_at DESC, id DESC LIMIT ?1",
            visible
        )) {
            Ok(mut stmt) => stmt
                .query_map(params![RECENT_LIMIT as i64], |row| {
                    Ok(RecentEntry {
                        headword: row.get(0)?,
                        gloss: row.get(1)?,
                        created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })
                .map(|rows| rows.filter_map(|r| r.ok()).collect::<Vec<_>>())
                .unwrap_or_default(),
            Err(_) => vec![],
        };

        Statistics {
            total,
            verified,
            by_class,
            recent,
        }
    }

    /// Usage counters for an entry, if it was ever searched
    pub fn usage(&self, entry_id: i64) -> Option<UsageStat> {
        self.conn()
            .ok()?
            .query_row(
                "SELECT entry_id, searches, views, last_search FROM usage_stats WHERE entry_id = ?1",
                params![entry_id],
                |row| {
                    Ok(UsageStat {
                        entry_id: row.get(0)?,
                        searches: row.get(1)?,
                        views: row.get(2)?,
                        last_search: row.get(3)?,
                    })
                },
            )
            .optional()
            .ok()
            .flatten()
    }
}
