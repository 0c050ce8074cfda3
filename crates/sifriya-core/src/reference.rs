//! Helpers for reference strings such as "Song of Songs 2:4".

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::model::IndexMetadata;
use crate::navigation::DEFAULT_CHAPTER_COUNT;

/// Upper bound on chapters offered for in-reader navigation
pub const MAX_CHAPTER_RANGE: usize = 150;

fn book_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s+\d+").expect("valid regex"))
}

fn chapter_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s(\d+)(?::|$)").expect("valid regex"))
}

/// Title part of a reference; multi-word titles are kept whole
pub fn book_title(reference: &str) -> &str {
    match book_pattern().captures(reference).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => reference.split(' ').next().unwrap_or_default(),
    }
}

/// Chapter number of a reference, 1 when there is none
pub fn chapter(reference: &str) -> usize {
    chapter_pattern()
        .captures(reference)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(1)
}

/// Chapters to offer for a work: `lengths[0]`, else a numeric `order`,
/// else `order[0]`, else the default, capped at [`MAX_CHAPTER_RANGE`].
pub fn chapter_range(index: &IndexMetadata) -> usize {
    let count = match (index.lengths.as_deref(), index.order.as_ref()) {
        (Some([first, ..]), _) => as_count(first),
        (_, Some(Value::Array(order))) => order.first().and_then(as_count),
        (_, Some(order)) => as_count(order),
        _ => None,
    };
    count.unwrap_or(DEFAULT_CHAPTER_COUNT).min(MAX_CHAPTER_RANGE)
}

fn as_count(value: &Value) -> Option<usize> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
}

/// "{book} {chapter}"
pub fn chapter_ref(book: &str, chapter: usize) -> String {
    format!("{} {}", book, chapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(json: &str) -> IndexMetadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_book_title() {
        assert_eq!(book_title("Genesis 1:1"), "Genesis");
        assert_eq!(book_title("Song of Songs 2:4"), "Song of Songs");
        assert_eq!(book_title("I Samuel 3"), "I Samuel");
        assert_eq!(book_title("Berakhot"), "Berakhot");
        assert_eq!(book_title("Pirkei Avot"), "Pirkei");
    }

    #[test]
    fn test_chapter() {
        assert_eq!(chapter("Genesis 12:3"), 12);
        assert_eq!(chapter("Psalms 23"), 23);
        assert_eq!(chapter("Berakhot 2a"), 1);
        assert_eq!(chapter("Genesis"), 1);
    }

    #[test]
    fn test_chapter_range_sources() {
        assert_eq!(chapter_range(&index(r#"{"lengths": [50, 1533]}"#)), 50);
        assert_eq!(chapter_range(&index(r#"{"order": 12}"#)), 12);
        assert_eq!(chapter_range(&index(r#"{"order": [7, 2]}"#)), 7);
        assert_eq!(chapter_range(&index(r#"{"lengths": [0]}"#)), DEFAULT_CHAPTER_COUNT);
        assert_eq!(chapter_range(&index(r#"{"title": "x"}"#)), DEFAULT_CHAPTER_COUNT);
    }

    #[test]
    fn test_chapter_range_is_capped() {
        assert_eq!(chapter_range(&index(r#"{"lengths": [150]}"#)), 150);
        assert_eq!(chapter_range(&index(r#"{"lengths": [151]}"#)), MAX_CHAPTER_RANGE);
        assert_eq!(chapter_range(&index(r#"{"order": 9000}"#)), MAX_CHAPTER_RANGE);
    }

    #[test]
    fn test_chapter_ref_round_trips_through_helpers() {
        let reference = chapter_ref("Song of Songs", 4);
        assert_eq!(book_title(&reference), "Song of Songs");
        assert_eq!(chapter(&reference), 4);
    }
}
