//! Typed responses of the library API.
//!
//! Fields the client does not use are dropped on decode. Everything is
//! defaulted so a sparse payload still decodes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Source or translation content: one string or one string per verse.
///
/// Nested arrays (multi-chapter spans) are flattened in order and `null`
/// entries become empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerseText {
    One(String),
    Many(Vec<String>),
}

impl Default for VerseText {
    fn default() -> Self {
        VerseText::One(String::new())
    }
}

impl<'de> Deserialize<'de> for VerseText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(VerseText::from)
    }
}

impl From<Value> for VerseText {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => VerseText::One(s),
            Value::Array(items) => {
                let mut verses = Vec::with_capacity(items.len());
                flatten_into(items, &mut verses);
                VerseText::Many(verses)
            }
            Value::Null => VerseText::default(),
            other => VerseText::One(other.to_string()),
        }
    }
}

fn flatten_into(items: Vec<Value>, out: &mut Vec<String>) {
    for item in items {
        match item {
            Value::String(s) => out.push(s),
            Value::Array(inner) => flatten_into(inner, out),
            Value::Null => out.push(String::new()),
            other => out.push(other.to_string()),
        }
    }
}

impl VerseText {
    /// As an ordered sequence; a single string is a one-element sequence
    pub fn verses(&self) -> Vec<&str> {
        match self {
            VerseText::One(s) => vec![s.as_str()],
            VerseText::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VerseText::One(_) => 1,
            VerseText::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            VerseText::One(s) if index == 0 => Some(s),
            VerseText::One(_) => None,
            VerseText::Many(v) => v.get(index).map(String::as_str),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, VerseText::Many(_))
    }
}

/// A resolved reference's bilingual content (`/texts/{ref}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    #[serde(default, rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub he_ref: Option<String>,
    #[serde(default)]
    pub index_title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub he: VerseText,
    #[serde(default)]
    pub text: VerseText,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub section_ref: Option<String>,
    #[serde(default)]
    pub book: Option<String>,
    #[serde(default, rename = "type")]
    pub text_type: Option<String>,
}

/// Section-structure descriptor of a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub lengths: Option<Vec<Value>>,
    #[serde(default)]
    pub nodes: Option<Vec<Value>>,
}

/// Index metadata for one work (`/index/{title}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub he_title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub lengths: Option<Vec<Value>>,
    /// A bare number or an array of numbers depending on the work
    #[serde(default)]
    pub order: Option<Value>,
    #[serde(default)]
    pub section_names: Vec<String>,
}

impl IndexMetadata {
    /// `schema.lengths` when present, else top-level `lengths`
    pub fn section_lengths(&self) -> Option<&[Value]> {
        self.schema
            .as_ref()
            .and_then(|s| s.lengths.as_deref())
            .or(self.lengths.as_deref())
    }
}

/// Options for `get_text`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    pub lang: Option<TextLanguage>,
    pub context: Option<u32>,
    pub pad: Option<bool>,
    pub wrap_links: Option<bool>,
}

impl TextOptions {
    pub fn bilingual() -> Self {
        Self {
            lang: Some(TextLanguage::Bi),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLanguage {
    En,
    He,
    Bi,
}

impl TextLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextLanguage::En => "en",
            TextLanguage::He => "he",
            TextLanguage::Bi => "bi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Text,
    Sheet,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Text => "text",
            SearchType::Sheet => "sheet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Exact,
    NaiveLemmatizer,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Exact => "exact",
            SearchField::NaiveLemmatizer => "naive_lemmatizer",
        }
    }
}

/// Options for `search`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub search_type: Option<SearchType>,
    pub field: Option<SearchField>,
    pub slop: Option<u32>,
    pub filters: Vec<String>,
    pub size: Option<u32>,
    pub from: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSearchResponse {
    #[serde(default)]
    pub hits: RawHits,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawHits {
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawHit {
    #[serde(default, rename = "_source")]
    pub source: RawHitSource,
    #[serde(default)]
    pub highlight: Option<RawHighlight>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawHitSource {
    #[serde(default, rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub he_ref: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawHighlight {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub naive_lemmatizer: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchHit {
    pub reference: String,
    pub he_ref: Option<String>,
    pub version: Option<String>,
    pub lang: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

impl From<RawSearchResponse> for SearchResults {
    fn from(raw: RawSearchResponse) -> Self {
        // Newer search backends wrap the count as {"value": n}
        let total = match &raw.hits.total {
            Value::Number(n) => n.as_u64().unwrap_or_default(),
            Value::Object(map) => map.get("value").and_then(Value::as_u64).unwrap_or_default(),
            _ => raw.hits.hits.len() as u64,
        };

        let hits = raw
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let snippet = hit.highlight.and_then(|h| {
                    h.exact
                        .into_iter()
                        .chain(h.naive_lemmatizer)
                        .next()
                });
                SearchHit {
                    reference: hit.source.reference,
                    he_ref: hit.source.he_ref,
                    version: hit.source.version,
                    lang: hit.source.lang,
                    snippet,
                }
            })
            .collect();

        SearchResults { total, hits }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bilingual {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub he: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    #[serde(default)]
    pub title: Bilingual,
    #[serde(default)]
    pub display_value: Bilingual,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub order: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Today's readings (`/calendars`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default)]
    pub calendar_items: Vec<CalendarItem>,
    #[serde(default)]
    pub date: String,
}

/// Name lookup and completion (`/name/{name}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameCompletion {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub is_ref: bool,
    #[serde(default)]
    pub completions: Vec<String>,
    #[serde(default)]
    pub object_types: Vec<String>,
}

/// A connection between two references (`/links/{ref}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default, rename = "index_title")]
    pub index_title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub link_type: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub anchor_ref: Option<String>,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub source_he_ref: Option<String>,
    #[serde(default)]
    pub he: Option<VerseText>,
    #[serde(default)]
    pub text: Option<VerseText>,
}

/// One available edition of a work (`/texts/versions/{title}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVersion {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version_title: String,
    #[serde(default)]
    pub version_source: Option<String>,
    #[serde(default)]
    pub version_title_in_hebrew: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}
