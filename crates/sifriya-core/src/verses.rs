//! Verse alignment, markup cleaning and layout projection.
//!
//! Everything here works on a borrowed [`TextPayload`] and returns owned
//! rows; the payload itself is never modified, so toggling vowels or layout
//! only changes what is projected.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::model::TextPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Source above translation for each verse
    #[default]
    Stacked,
    /// Two independent columns
    SideBySide,
    SourceOnly,
    TranslationOnly,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        RenderMode::Stacked,
        RenderMode::SideBySide,
        RenderMode::SourceOnly,
        RenderMode::TranslationOnly,
    ];

    pub fn next(self) -> Self {
        match self {
            RenderMode::Stacked => RenderMode::SideBySide,
            RenderMode::SideBySide => RenderMode::SourceOnly,
            RenderMode::SourceOnly => RenderMode::TranslationOnly,
            RenderMode::TranslationOnly => RenderMode::Stacked,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderMode::Stacked => "Stacked",
            RenderMode::SideBySide => "Side by side",
            RenderMode::SourceOnly => "Hebrew only",
            RenderMode::TranslationOnly => "English only",
        }
    }

    pub fn shows_popup(self) -> bool {
        self == RenderMode::SourceOnly
    }
}

/// One aligned position; missing cells are empty strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedVerse {
    pub index: usize,
    pub source: String,
    pub translation: String,
}

impl AlignedVerse {
    /// 1-based number shown beside the verse
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRow {
    pub index: usize,
    pub source: Option<String>,
    pub translation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedText {
    Rows(Vec<VerseRow>),
    Columns {
        source: Vec<VerseRow>,
        translation: Vec<VerseRow>,
    },
}

impl RenderedText {
    pub fn row_count(&self) -> usize {
        match self {
            RenderedText::Rows(rows) => rows.len(),
            RenderedText::Columns {
                source,
                translation,
            } => source.len().max(translation.len()),
        }
    }
}

fn source_markup() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<small>.*?</small>|<sup>.*?</sup>|<sub>.*?</sub>").expect("valid regex")
    })
}

fn translation_markup() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<small>.*?</small>|<sup>.*?</sup>").expect("valid regex"))
}

/// Remove inline annotations from source-language text
pub fn clean_source(text: &str) -> String {
    source_markup().replace_all(text, "").into_owned()
}

/// Remove footnote markers from translation text
pub fn clean_translation(text: &str) -> String {
    translation_markup().replace_all(text, "").into_owned()
}

/// Drop cantillation and vowel points (U+0591..=U+05C7)
pub fn strip_vowels(text: &str) -> String {
    text.chars()
        .filter(|c| !('\u{0591}'..='\u{05C7}').contains(c))
        .collect()
}

fn project_source(text: &str, show_vowels: bool) -> String {
    let cleaned = clean_source(text);
    if show_vowels {
        cleaned
    } else {
        strip_vowels(&cleaned)
    }
}

/// Pair source and translation by index up to the longer of the two
pub fn align(payload: &TextPayload, show_vowels: bool) -> Vec<AlignedVerse> {
    let source = payload.he.verses();
    let translation = payload.text.verses();
    let len = source.len().max(translation.len());

    (0..len)
        .map(|index| AlignedVerse {
            index,
            source: source
                .get(index)
                .map(|s| project_source(s, show_vowels))
                .unwrap_or_default(),
            translation: translation
                .get(index)
                .map(|t| clean_translation(t))
                .unwrap_or_default(),
        })
        .collect()
}

pub fn render(payload: &TextPayload, mode: RenderMode, show_vowels: bool) -> RenderedText {
    if mode == RenderMode::SideBySide {
        let source = payload
            .he
            .verses()
            .into_iter()
            .enumerate()
            .map(|(index, s)| VerseRow {
                index,
                source: Some(project_source(s, show_vowels)),
                translation: None,
            })
            .collect();
        let translation = payload
            .text
            .verses()
            .into_iter()
            .enumerate()
            .map(|(index, t)| VerseRow {
                index,
                source: None,
                translation: Some(clean_translation(t)),
            })
            .collect();
        return RenderedText::Columns {
            source,
            translation,
        };
    }

    let rows = align(payload, show_vowels)
        .into_iter()
        .map(|verse| VerseRow {
            index: verse.index,
            source: (mode != RenderMode::TranslationOnly).then_some(verse.source),
            translation: (mode != RenderMode::SourceOnly).then_some(verse.translation),
        })
        .collect();
    RenderedText::Rows(rows)
}

/// Translation shown for the selected verse in source-only mode.
///
/// A plain-string translation is shown whole; an index past the end of a
/// sequence gives an empty popup.
pub fn popup_translation(
    payload: &TextPayload,
    mode: RenderMode,
    selected: Option<usize>,
) -> Option<String> {
    if !mode.shows_popup() {
        return None;
    }
    let selected = selected?;
    let index = if payload.text.is_sequence() { selected } else { 0 };
    Some(payload.text.get(index).map(clean_translation).unwrap_or_default())
}
