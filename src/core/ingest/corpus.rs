//! Source corpus records
//!
//! The corpus is a JSON object with a `palavras` array. Records are parsed
//! one at a time so a malformed word fails on its own instead of rejecting
//! the whole file.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Top-level corpus document
#[derive(Debug, Default, Deserialize)]
pub struct Corpus {
    #[serde(rename = "palavras", default)]
    pub words: Vec<JsonValue>,
}

/// One source word
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordRecord {
    #[serde(rename = "palavra_emakhua", default)]
    pub headword: Option<String>,
    #[serde(rename = "classe_gramatical", default)]
    pub word_class: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    #[serde(rename = "genero", default)]
    pub gender: Option<String>,
    #[serde(rename = "numero", default)]
    pub number: Option<String>,
    #[serde(rename = "frequencia", default)]
    pub frequency: Option<String>,
    #[serde(rename = "observacoes", default)]
    pub observations: Option<String>,
    /// Keyed by variant code
    #[serde(rename = "variantes", default)]
    pub variants: BTreeMap<String, VariantData>,
}

/// Per-variant data of a word
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantData {
    #[serde(rename = "pronuncia", default)]
    pub pronunciation: Option<String>,
    #[serde(rename = "tom", default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub plural: Option<String>,
    /// Stored verbatim as JSON text
    #[serde(rename = "conjugacao", default)]
    pub conjugation: Option<JsonValue>,
    #[serde(rename = "significados", default)]
    pub meanings: Vec<Meaning>,
}

/// One sense of a word within a variant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meaning {
    #[serde(rename = "definicao_emakhua", default)]
    pub definition_source: Option<String>,
    #[serde(rename = "definicao_portugues", default)]
    pub definition_target: Option<String>,
    #[serde(rename = "contexto", default)]
    pub context: Option<String>,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "exemplos", default)]
    pub examples: Option<ExamplePair>,
}

/// An example sentence and its translation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamplePair {
    #[serde(default)]
    pub emakhua: Option<String>,
    #[serde(default)]
    pub portugues: Option<String>,
}

impl WordRecord {
    pub fn from_value(value: &JsonValue) -> Result<Self, serde_json::Error> {
        WordRecord::deserialize(value)
    }
}

/// Treat empty strings like missing values
pub(super) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
