//! Lexicon type definitions
//!
//! Records returned by the store, inputs accepted by it, and the error type
//! every fallible store operation returns.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::core::codec::SnapshotError;

/// Dialect assigned when none is given
pub const DEFAULT_DIALECT: &str = "padrão";

/// Author recorded on entries created through the store
pub const DEFAULT_AUTHOR: &str = "admin";

// =========================================================================
// Errors
// =========================================================================

/// Errors returned by store operations
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Lexicon is not initialized")]
    #[diagnostic(code(emakhua::store::not_initialized), help("call init() first"))]
    NotInitialized,

    #[error("Failed to initialize lexicon: {reason}")]
    #[diagnostic(code(emakhua::store::initialization))]
    Initialization { reason: String },

    /// Caller-supplied fields missing or invalid
    #[error("{0}")]
    #[diagnostic(code(emakhua::store::validation))]
    Validation(String),

    /// Uniqueness or foreign-key violation, engine message passed through
    #[error("{0}")]
    #[diagnostic(code(emakhua::store::constraint))]
    Constraint(String),

    #[error("Entry not found: {0}")]
    #[diagnostic(code(emakhua::store::not_found))]
    NotFound(i64),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    /// All-or-nothing import failed and was rolled back
    #[error("Import rolled back: {reason}")]
    #[diagnostic(code(emakhua::store::transaction))]
    Transaction { reason: String },

    #[error("Database error: {0}")]
    #[diagnostic(code(emakhua::store::engine))]
    Engine(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref err, ref msg)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            other => StoreError::Engine(other),
        }
    }
}

impl StoreError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

// =========================================================================
// Records
// =========================================================================

/// A category tag with display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "icone", default)]
    pub icon: Option<String>,
    #[serde(rename = "cor", default)]
    pub color: Option<String>,
    #[serde(rename = "ordem", default, deserialize_with = "flag::int_or_null")]
    pub order: i64,
}

/// A dictionary entry (headword/gloss pair)
///
/// Field names on the wire follow the portable interchange format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    #[serde(rename = "emakhua")]
    pub headword: String,
    #[serde(rename = "portugues")]
    pub gloss: String,
    #[serde(rename = "classe_gramatical", default)]
    pub word_class: Option<String>,
    #[serde(rename = "tom", default)]
    pub tone: Option<String>,
    #[serde(rename = "dialeto", default = "default_dialect", deserialize_with = "dialect_or_default")]
    pub dialect: String,
    #[serde(rename = "exemplo_emakhua", default)]
    pub example_source: Option<String>,
    #[serde(rename = "exemplo_traducao", default)]
    pub example_target: Option<String>,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "data_cadastro", default)]
    pub created_at: String,
    #[serde(rename = "data_atualizacao", default)]
    pub updated_at: String,
    #[serde(rename = "usuario_cadastro", default = "default_author")]
    pub created_by: String,
    #[serde(rename = "ativo", default = "flag::yes", with = "flag")]
    pub active: bool,
    #[serde(rename = "verificada", default, with = "flag")]
    pub verified: bool,
    #[serde(rename = "categorias", default)]
    pub categories: Vec<Category>,
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn dialect_or_default<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(de)?;
    Ok(value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_dialect))
}

/// Boolean flags stored as 0/1 integers
///
/// Older exports wrote SQLite's integers, hand-written files tend to use
/// `true`/`false`; both are accepted and integers are written back.
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    pub fn serialize<S: Serializer>(value: &bool, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_i64(i64::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
        Ok(match Option::<Raw>::deserialize(de)? {
            Some(Raw::Bool(b)) => b,
            Some(Raw::Int(i)) => i != 0,
            None => false,
        })
    }

    pub fn int_or_null<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
        Ok(Option::<i64>::deserialize(de)?.unwrap_or(0))
    }

    pub fn yes() -> bool {
        true
    }
}

/// Fields for a new entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub headword: String,
    pub gloss: String,
    pub word_class: Option<String>,
    pub tone: Option<String>,
    /// Defaults to [`DEFAULT_DIALECT`]
    pub dialect: Option<String>,
    pub example_source: Option<String>,
    pub example_target: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the profile's verification default
    pub verified: Option<bool>,
    /// Category ids to attach
    pub categories: Vec<i64>,
}

impl NewEntry {
    pub fn new(headword: impl Into<String>, gloss: impl Into<String>) -> Self {
        Self {
            headword: headword.into(),
            gloss: gloss.into(),
            ..Default::default()
        }
    }

    pub fn word_class(mut self, class: impl Into<String>) -> Self {
        self.word_class = Some(class.into());
        self
    }

    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn categories(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.categories = ids.into_iter().collect();
        self
    }
}

// =========================================================================
// Partial updates
// =========================================================================

/// Columns a partial update may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryField {
    Headword,
    Gloss,
    WordClass,
    Tone,
    Dialect,
    ExampleSource,
    ExampleTarget,
    Notes,
    Verified,
    Active,
}

impl EntryField {
    pub const ALL: [EntryField; 10] = [
        EntryField::Headword,
        EntryField::Gloss,
        EntryField::WordClass,
        EntryField::Tone,
        EntryField::Dialect,
        EntryField::ExampleSource,
        EntryField::ExampleTarget,
        EntryField::Notes,
        EntryField::Verified,
        EntryField::Active,
    ];

    /// Field name as used by the portable format and the command line
    pub fn name(&self) -> &'static str {
        match self {
            EntryField::Headword => "emakhua",
            EntryField::Gloss => "portugues",
            EntryField::WordClass => "classe_gramatical",
            EntryField::Tone => "tom",
            EntryField::Dialect => "dialeto",
            EntryField::ExampleSource => "exemplo_emakhua",
            EntryField::ExampleTarget => "exemplo_traducao",
            EntryField::Notes => "notas",
            EntryField::Verified => "verificada",
            EntryField::Active => "ativo",
        }
    }

    /// Backing column in `entries`
    pub fn column(&self) -> &'static str {
        match self {
            EntryField::Headword => "headword",
            EntryField::Gloss => "gloss",
            EntryField::WordClass => "word_class",
            EntryField::Tone => "tone",
            EntryField::Dialect => "dialect",
            EntryField::ExampleSource => "example_source",
            EntryField::ExampleTarget => "example_target",
            EntryField::Notes => "notes",
            EntryField::Verified => "verified",
            EntryField::Active => "active",
        }
    }

    /// Resolve a field by its wire name or column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name || f.column() == name)
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, EntryField::Verified | EntryField::Active)
    }

    /// Fields that can never be blank
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            EntryField::Headword | EntryField::Gloss | EntryField::Dialect
        )
    }
}

/// A value assigned by a partial update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    Flag(bool),
}

/// Key used for category replacement in loosely-typed patches
pub const CATEGORIES_FIELD: &str = "categorias";

/// A partial update: some columns and optionally a new category set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub(crate) fields: Vec<(EntryField, FieldValue)>,
    pub(crate) categories: Option<Vec<i64>>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: EntryField, value: FieldValue) -> Self {
        self.fields.retain(|(f, _)| *f != field);
        self.fields.push((field, value));
        self
    }

    pub fn text(self, field: EntryField, value: impl Into<String>) -> Self {
        self.set(field, FieldValue::Text(Some(value.into())))
    }

    pub fn flag(self, field: EntryField, value: bool) -> Self {
        self.set(field, FieldValue::Flag(value))
    }

    /// Replace all category associations with these ids
    pub fn categories(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.categories = Some(ids.into_iter().collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.categories.is_none()
    }

    pub fn fields(&self) -> impl Iterator<Item = &(EntryField, FieldValue)> {
        self.fields.iter()
    }

    pub fn category_ids(&self) -> Option<&[i64]> {
        self.categories.as_deref()
    }

    /// Build a patch from a JSON object
    ///
    /// Keys outside the updatable set are ignored. `categorias` takes an
    /// array of ids or of category objects carrying an `id`.
    pub fn from_json(value: &JsonValue) -> Result<Self, StoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StoreError::Validation("Update must be a JSON object".to_string()))?;

        let mut patch = EntryPatch::new();
        for (key, v) in obj {
            if key == CATEGORIES_FIELD {
                patch = patch.categories(category_ids_from_json(v)?);
                continue;
            }
            let Some(field) = EntryField::from_name(key) else {
                continue;
            };
            let value = if field.is_flag() {
                FieldValue::Flag(flag_from_json(key, v)?)
            } else {
                FieldValue::Text(text_from_json(key, v)?)
            };
            patch = patch.set(field, value);
        }
        Ok(patch)
    }

    /// Build a patch from `field=value` pairs (command line)
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, StoreError> {
        let mut patch = EntryPatch::new();
        for (key, raw) in pairs {
            if key == CATEGORIES_FIELD {
                let ids = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<i64>().map_err(|_| {
                            StoreError::Validation(format!("Invalid category id: {}", s))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                patch = patch.categories(ids);
                continue;
            }
            let Some(field) = EntryField::from_name(key) else {
                continue;
            };
            let value = if field.is_flag() {
                FieldValue::Flag(parse_flag(key, raw)?)
            } else if raw.is_empty() {
                FieldValue::Text(None)
            } else {
                FieldValue::Text(Some(raw.to_string()))
            };
            patch = patch.set(field, value);
        }
        Ok(patch)
    }
}

fn text_from_json(key: &str, v: &JsonValue) -> Result<Option<String>, StoreError> {
    match v {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(s.clone())),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        _ => Err(StoreError::Validation(format!(
            "Field '{}' must be text",
            key
        ))),
    }
}

fn flag_from_json(key: &str, v: &JsonValue) -> Result<bool, StoreError> {
    match v {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) if n.as_i64().is_some() => Ok(n.as_i64() != Some(0)),
        JsonValue::String(s) => parse_flag(key, s),
        _ => Err(StoreError::Validation(format!(
            "Field '{}' must be a boolean",
            key
        ))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, StoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "sim" => Ok(true),
        "0" | "false" | "no" | "nao" | "não" => Ok(false),
        _ => Err(StoreError::Validation(format!(
            "Field '{}' must be a boolean, got '{}'",
            key, raw
        ))),
    }
}

fn category_ids_from_json(v: &JsonValue) -> Result<Vec<i64>, StoreError> {
    let invalid = || StoreError::Validation("'categorias' must be a list of category ids".to_string());
    let items = v.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| {
            item.as_i64()
                .or_else(|| item.get("id").and_then(JsonValue::as_i64))
                .ok_or_else(invalid)
        })
        .collect()
}

// =========================================================================
// Queries and results
// =========================================================================

/// Conjunctive search filters; `None` means "don't filter"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring of headword or gloss
    pub term: Option<String>,
    pub word_class: Option<String>,
    pub dialect: Option<String>,
    pub verified: Option<bool>,
    pub limit: Option<usize>,
}

impl SearchFilter {
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn word_class(mut self, class: impl Into<String>) -> Self {
        self.word_class = Some(class.into());
        self
    }

    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Which side of the pair a directional search matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    /// Match the Emakhua headword
    #[default]
    EmakhuaToPortuguese,
    /// Match the Portuguese gloss
    PortugueseToEmakhua,
}

/// Count of entries sharing one grammatical class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    #[serde(rename = "classe")]
    pub class: String,
    pub total: usize,
}

/// A recently added entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentEntry {
    #[serde(rename = "emakhua")]
    pub headword: String,
    #[serde(rename = "portugues")]
    pub gloss: String,
    #[serde(rename = "data")]
    pub created_at: String,
}

/// Aggregate counts over the lexicon
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    #[serde(rename = "totalPalavras")]
    pub total: usize,
    #[serde(rename = "palavrasVerificadas")]
    pub verified: usize,
    #[serde(rename = "porClasse")]
    pub by_class: Vec<ClassCount>,
    #[serde(rename = "recentes")]
    pub recent: Vec<RecentEntry>,
}

/// Per-entry usage counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStat {
    pub entry_id: i64,
    pub searches: i64,
    pub views: i64,
    pub last_search: Option<String>,
}

/// A full binary backup of the engine state
#[derive(Debug, Clone)]
pub struct Backup {
    pub data: Vec<u8>,
    pub size: usize,
    pub timestamp: DateTime<Utc>,
}
