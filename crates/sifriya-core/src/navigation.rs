//! Drill-down navigation over the library: categories, chapter pick, reading.
//!
//! All transitions are synchronous. Chapter-count resolution is the one
//! asynchronous step; [`NavigationState::select_item`] hands out a
//! [`ChapterRequest`] and the caller feeds the outcome back through
//! [`NavigationState::apply_chapter_count`], which drops results for a
//! book the user has already navigated away from.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::LibraryApi;
use crate::error::Result;
use crate::library::{Language, LibraryNode};
use crate::model::IndexMetadata;

/// Used when the index gives no usable chapter count
pub const DEFAULT_CHAPTER_COUNT: usize = 50;

/// Largest chapter count taken from index metadata; anything above is
/// treated as unusable
pub const MAX_CHAPTER_COUNT: usize = 1000;

pub const RECENTLY_VIEWED_LIMIT: usize = 5;

/// History shown before the user has opened anything
pub const SEED_RECENTLY_VIEWED: [&str; 2] = ["Genesis 1", "Psalms 23"];

/// Quick jumps offered on the library screen, as `(title, reference)`
pub const POPULAR_TEXTS: [(&str, &str); 8] = [
    ("Genesis", "Genesis 1:1"),
    ("Exodus", "Exodus 1:1"),
    ("Leviticus", "Leviticus 1:1"),
    ("Numbers", "Numbers 1:1"),
    ("Deuteronomy", "Deuteronomy 1:1"),
    ("Psalms", "Psalms 1:1"),
    ("Proverbs", "Proverbs 1:1"),
    ("Song of Songs", "Song of Songs 1:1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Library,
    ChapterSelect,
    Reading,
}

/// Ticket for one chapter-count resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRequest {
    pub book: String,
    generation: u64,
}

/// What `select_item` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Entered a category
    Drilled,
    /// Picked a work; resolve its chapter count and report back
    Book(ChapterRequest),
    /// Nothing selectable at that index
    Ignored,
}

/// What `apply_chapter_count` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterOutcome {
    Chapters(usize),
    /// Went straight to reading this reference
    Opened(String),
    /// The request no longer matches the live state
    Stale,
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    library: Arc<Vec<LibraryNode>>,
    /// Sibling indices from the root to the current category
    path: Vec<usize>,
    selected_book: Option<String>,
    chapters: Vec<usize>,
    loading_chapters: bool,
    selected_ref: Option<String>,
    recently_viewed: Vec<String>,
    generation: u64,
}

impl NavigationState {
    pub fn new(library: Arc<Vec<LibraryNode>>) -> Self {
        Self {
            library,
            path: Vec::new(),
            selected_book: None,
            chapters: Vec::new(),
            loading_chapters: false,
            selected_ref: None,
            recently_viewed: SEED_RECENTLY_VIEWED.iter().map(|r| r.to_string()).collect(),
            generation: 0,
        }
    }

    /// Swap in a freshly loaded library and return to its root
    pub fn replace_library(&mut self, library: Arc<Vec<LibraryNode>>) {
        self.library = library;
        self.go_home();
    }

    pub fn library(&self) -> &Arc<Vec<LibraryNode>> {
        &self.library
    }

    pub fn screen(&self) -> Screen {
        if self.selected_ref.is_some() {
            Screen::Reading
        } else if self.selected_book.is_some() {
            Screen::ChapterSelect
        } else {
            Screen::Library
        }
    }

    /// Siblings currently listed
    pub fn current_items(&self) -> &[LibraryNode] {
        let mut items: &[LibraryNode] = &self.library;
        for &index in &self.path {
            match items.get(index) {
                Some(node) => items = node.children(),
                None => return &[],
            }
        }
        items
    }

    /// Breadcrumb nodes, root first
    pub fn path(&self) -> Vec<&LibraryNode> {
        let mut nodes = Vec::with_capacity(self.path.len());
        let mut items: &[LibraryNode] = &self.library;
        for &index in &self.path {
            let Some(node) = items.get(index) else { break };
            nodes.push(node);
            items = node.children();
        }
        nodes
    }

    pub fn breadcrumb(&self, language: Language) -> Vec<&str> {
        self.path()
            .into_iter()
            .map(|node| node.display_title(language))
            .collect()
    }

    pub fn selected_book(&self) -> Option<&str> {
        self.selected_book.as_deref()
    }

    pub fn chapters(&self) -> &[usize] {
        &self.chapters
    }

    pub fn is_loading_chapters(&self) -> bool {
        self.loading_chapters
    }

    pub fn selected_ref(&self) -> Option<&str> {
        self.selected_ref.as_deref()
    }

    pub fn recently_viewed(&self) -> &[String] {
        &self.recently_viewed
    }

    pub fn select_item(&mut self, index: usize) -> Selection {
        let Some(item) = self.current_items().get(index) else {
            return Selection::Ignored;
        };

        if !item.is_leaf() {
            self.path.push(index);
            self.clear_book();
            return Selection::Drilled;
        }

        let Some(title) = item.title.clone() else {
            return Selection::Ignored;
        };

        self.generation += 1;
        self.selected_book = Some(title.clone());
        self.chapters.clear();
        self.loading_chapters = true;
        self.selected_ref = None;
        debug!(book = %title, "resolving chapter count");

        Selection::Book(ChapterRequest {
            book: title,
            generation: self.generation,
        })
    }

    pub fn apply_chapter_count(
        &mut self,
        request: &ChapterRequest,
        result: Result<usize>,
    ) -> ChapterOutcome {
        let live = request.generation == self.generation
            && self.loading_chapters
            && self.selected_book.as_deref() == Some(request.book.as_str());
        if !live {
            debug!(book = %request.book, "discarding stale chapter count");
            return ChapterOutcome::Stale;
        }

        self.loading_chapters = false;
        match result {
            Ok(0) => self.open_first_chapter(&request.book),
            Ok(count) if count > MAX_CHAPTER_COUNT => {
                warn!(book = %request.book, count, "implausible chapter count, using default");
                self.chapters = (1..=DEFAULT_CHAPTER_COUNT).collect();
                ChapterOutcome::Chapters(DEFAULT_CHAPTER_COUNT)
            }
            Ok(count) => {
                self.chapters = (1..=count).collect();
                ChapterOutcome::Chapters(count)
            }
            Err(err) => {
                warn!(book = %request.book, error = %err, "chapter count unavailable, opening chapter 1");
                self.open_first_chapter(&request.book)
            }
        }
    }

    fn open_first_chapter(&mut self, book: &str) -> ChapterOutcome {
        let reference = format!("{} 1", book);
        self.open_text(&reference);
        ChapterOutcome::Opened(reference)
    }

    /// Open `{book} {chapter}`; None without a selected book
    pub fn select_chapter(&mut self, chapter: usize) -> Option<String> {
        let book = self.selected_book.clone()?;
        let reference = format!("{} {}", book, chapter);
        self.open_text(&reference);
        Some(reference)
    }

    pub fn open_text(&mut self, reference: &str) {
        // Any chapter lookup still in flight is now irrelevant
        self.generation += 1;
        self.loading_chapters = false;
        self.selected_ref = Some(reference.to_string());

        if !self.recently_viewed.iter().any(|r| r == reference) {
            self.recently_viewed.insert(0, reference.to_string());
            self.recently_viewed.truncate(RECENTLY_VIEWED_LIMIT);
        }
    }

    pub fn go_back(&mut self) {
        match self.screen() {
            Screen::Reading => {
                self.selected_ref = None;
                if self.chapters.is_empty() {
                    self.clear_book();
                }
            }
            Screen::ChapterSelect => self.clear_book(),
            Screen::Library => {
                self.path.pop();
            }
        }
    }

    pub fn go_home(&mut self) {
        self.path.clear();
        self.clear_book();
        self.selected_ref = None;
    }

    fn clear_book(&mut self) {
        self.generation += 1;
        self.selected_book = None;
        self.chapters.clear();
        self.loading_chapters = false;
    }
}

/// Chapter count from index metadata: first section length, else the
/// number of top-level schema nodes, else [`DEFAULT_CHAPTER_COUNT`].
/// Lengths that are not finite or exceed [`MAX_CHAPTER_COUNT`] count as
/// unusable.
pub fn chapter_count(metadata: &IndexMetadata) -> usize {
    if let Some(first) = metadata.section_lengths().and_then(|l| l.first()) {
        return positive_count(first).unwrap_or(DEFAULT_CHAPTER_COUNT);
    }
    if let Some(nodes) = metadata.schema.as_ref().and_then(|s| s.nodes.as_ref()) {
        return nodes.len();
    }
    DEFAULT_CHAPTER_COUNT
}

fn positive_count(value: &serde_json::Value) -> Option<usize> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 1.0 && n <= MAX_CHAPTER_COUNT as f64 {
        Some(n.trunc() as usize)
    } else {
        None
    }
}

pub async fn resolve_chapter_count(api: &LibraryApi, book: &str) -> Result<usize> {
    let metadata = api.get_index(book).await?;
    Ok(chapter_count(&metadata))
}
