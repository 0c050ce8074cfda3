use ratatui::widgets::ListState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sifriya_core::error::ApiError;
use sifriya_core::model::IndexMetadata;
use sifriya_core::navigation::{self, ChapterOutcome, Selection, POPULAR_TEXTS};
use sifriya_core::reader;
use sifriya_core::reference;
use sifriya_core::search;
use sifriya_core::tree::{self, DEFAULT_MAX_DEPTH};
use sifriya_core::{
    CategoryTreeNode, ChapterRequest, Config, Expansion, Language, LibraryApi, LibraryNode, NavigationState,
    ReaderState, Screen, SearchResults, SearchSession, SearchTicket, TextPayload, TextTicket,
};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Drill-down browsing and reading
    Browse,
    /// Whole library as a collapsible tree
    Outline,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Results of background requests, applied on the UI task
#[derive(Debug)]
pub enum TaskResult {
    Library(Result<Vec<LibraryNode>, ApiError>),
    Chapters(ChapterRequest, Result<usize, ApiError>),
    Text(TextTicket, Result<TextPayload, ApiError>),
    /// Index of the book being read, for in-reader chapter jumps
    ReaderIndex(String, Result<IndexMetadata, ApiError>),
    Search(SearchTicket, Result<SearchResults, ApiError>),
}

pub struct App {
    pub should_quit: bool,
    pub view: View,
    pub input_mode: InputMode,
    pub language: Language,

    pub config: Config,
    pub api: LibraryApi,

    pub nav: NavigationState,
    pub list_state: ListState,
    pub library_loading: bool,

    pub reader: ReaderState,
    pub verse_cursor: usize,
    pub content_scroll: u16,
    /// Side-by-side translation column scrolls on its own
    pub translation_scroll: u16,
    /// Book the chapter range below belongs to
    pub reader_book: Option<String>,
    pub reader_chapters: usize,

    /// Sorted category tree, rebuilt only when the library is replaced
    pub tree: Vec<CategoryTreeNode>,
    pub expansion: Expansion,
    pub outline_state: ListState,

    pub search: SearchSession,
    pub search_input: String,
    pub search_state: ListState,
    search_task: Option<JoinHandle<()>>,

    pub status: Option<String>,
    pub spinner_frame: u8,

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: Config, events: UnboundedSender<AppEvent>) -> Self {
        let api = LibraryApi::with_policy(&config.base_url, config.retry_policy());
        let reader = ReaderState::new(config.display_settings());

        Self {
            should_quit: false,
            view: View::Browse,
            input_mode: InputMode::Normal,
            language: config.language,

            api,
            config,

            nav: NavigationState::new(Arc::new(Vec::new())),
            list_state: ListState::default(),
            library_loading: false,

            reader,
            verse_cursor: 0,
            content_scroll: 0,
            translation_scroll: 0,
            reader_book: None,
            reader_chapters: 0,

            tree: Vec::new(),
            expansion: Expansion::default(),
            outline_state: ListState::default(),

            search: SearchSession::default(),
            search_input: String::new(),
            search_state: ListState::default(),
            search_task: None,

            status: None,
            spinner_frame: 0,

            events,
        }
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: std::future::Future<Output = TaskResult> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let _ = events.send(AppEvent::Task(request.await));
        });
    }

    pub fn load_library(&mut self) {
        self.library_loading = true;
        self.status = None;
        let api = self.api.clone();
        self.spawn_request(async move { TaskResult::Library(api.get_library().await) });
    }

    pub fn apply(&mut self, result: TaskResult) {
        match result {
            TaskResult::Library(Ok(nodes)) => {
                self.library_loading = false;
                info!(categories = nodes.len(), "library loaded");
                self.nav.replace_library(Arc::new(nodes));
                self.tree = tree::build_tree(self.nav.library(), &[]);
                self.expansion = Expansion::new(&self.tree);
                self.reader.close();
                self.list_state.select(Some(0));
                self.outline_state.select(Some(0));
            }
            TaskResult::Library(Err(err)) => {
                self.library_loading = false;
                self.status = Some(format!("Could not load the library: {} (r to retry)", err));
            }
            TaskResult::Chapters(request, result) => {
                match self.nav.apply_chapter_count(&request, result) {
                    ChapterOutcome::Chapters(_) => self.list_state.select(Some(0)),
                    ChapterOutcome::Opened(reference) => self.start_text_load(&reference),
                    ChapterOutcome::Stale => {}
                }
            }
            TaskResult::Text(ticket, result) => {
                let book = result.as_ref().ok().map(|p| {
                    if p.index_title.is_empty() {
                        reference::book_title(&p.reference).to_string()
                    } else {
                        p.index_title.clone()
                    }
                });
                if self.reader.finish_load(&ticket, result) {
                    if let Some(error) = self.reader.error() {
                        self.status = Some(error.to_string());
                    } else if let Some(book) = book {
                        self.load_reader_index(book);
                    }
                }
            }
            TaskResult::ReaderIndex(book, result) => {
                if self.reader_book.as_deref() != Some(book.as_str()) {
                    return;
                }
                self.reader_chapters = match result {
                    Ok(index) => reference::chapter_range(&index),
                    Err(err) => {
                        warn!(book = %book, error = %err, "no index for chapter jumps");
                        navigation::DEFAULT_CHAPTER_COUNT
                    }
                };
            }
            TaskResult::Search(ticket, result) => {
                if self.search.accept(&ticket, result) {
                    self.search_task = None;
                    let has_hits = self.search.results().is_some_and(|r| !r.hits.is_empty());
                    self.search_state.select(has_hits.then_some(0));
                }
            }
        }
    }

    // Browsing

    pub fn list_len(&self) -> usize {
        match self.nav.screen() {
            Screen::Library => self.nav.current_items().len(),
            Screen::ChapterSelect => self.nav.chapters().len(),
            Screen::Reading => 0,
        }
    }

    pub fn list_down(&mut self) {
        let len = self.list_len();
        if len > 0 {
            let i = self.list_state.selected().unwrap_or(0);
            self.list_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn list_up(&mut self) {
        let i = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(i.saturating_sub(1)));
    }

    pub fn highlighted_item(&self) -> Option<&LibraryNode> {
        if self.nav.screen() != Screen::Library {
            return None;
        }
        self.list_state
            .selected()
            .and_then(|i| self.nav.current_items().get(i))
    }

    pub fn select_current(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };

        match self.nav.screen() {
            Screen::Library => match self.nav.select_item(index) {
                Selection::Drilled => self.list_state.select(Some(0)),
                Selection::Book(request) => {
                    self.list_state.select(None);
                    let api = self.api.clone();
                    self.spawn_request(async move {
                        let result = navigation::resolve_chapter_count(&api, &request.book).await;
                        TaskResult::Chapters(request, result)
                    });
                }
                Selection::Ignored => {}
            },
            Screen::ChapterSelect => {
                let Some(&chapter) = self.nav.chapters().get(index) else {
                    return;
                };
                if let Some(reference) = self.nav.select_chapter(chapter) {
                    self.start_text_load(&reference);
                }
            }
            Screen::Reading => {}
        }
    }

    pub fn open_reference(&mut self, reference: &str) {
        self.view = View::Browse;
        self.nav.open_text(reference);
        self.start_text_load(reference);
    }

    fn start_text_load(&mut self, reference: &str) {
        self.status = None;
        self.verse_cursor = 0;
        self.content_scroll = 0;
        self.translation_scroll = 0;
        let ticket = self.reader.begin_load(reference);
        let api = self.api.clone();
        self.spawn_request(async move {
            let result = reader::load_text(&api, &ticket.reference).await;
            TaskResult::Text(ticket, result)
        });
    }

    fn load_reader_index(&mut self, book: String) {
        if self.reader_book.as_deref() == Some(book.as_str()) {
            return;
        }
        self.reader_book = Some(book.clone());
        self.reader_chapters = 0;
        let api = self.api.clone();
        self.spawn_request(async move {
            let result = api.get_index(&book).await;
            TaskResult::ReaderIndex(book, result)
        });
    }

    pub fn go_back(&mut self) {
        if self.nav.screen() == Screen::Reading {
            self.reader.close();
        }
        self.nav.go_back();
        self.status = None;
        self.list_state.select((self.list_len() > 0).then_some(0));
    }

    pub fn go_home(&mut self) {
        self.reader.close();
        self.nav.go_home();
        self.view = View::Browse;
        self.status = None;
        self.list_state.select((self.list_len() > 0).then_some(0));
    }

    pub fn open_recent(&mut self, slot: usize) {
        if let Some(reference) = self.nav.recently_viewed().get(slot).cloned() {
            self.open_reference(&reference);
        }
    }

    pub fn open_popular(&mut self, slot: usize) {
        if let Some((_, reference)) = POPULAR_TEXTS.get(slot) {
            self.open_reference(reference);
        }
    }

    // Reading

    pub fn verse_count(&self) -> usize {
        self.reader.rendered().map_or(0, |r| r.row_count())
    }

    pub fn verse_down(&mut self) {
        let count = self.verse_count();
        if count > 0 {
            self.verse_cursor = (self.verse_cursor + 1).min(count - 1);
        }
    }

    pub fn verse_up(&mut self) {
        self.verse_cursor = self.verse_cursor.saturating_sub(1);
    }

    pub fn toggle_verse(&mut self) {
        if self.verse_cursor < self.verse_count() {
            self.reader.toggle_verse(self.verse_cursor);
        }
    }

    pub fn next_section(&mut self) {
        if let Some(next) = self.reader.next_ref().map(str::to_string) {
            self.open_reference(&next);
        }
    }

    pub fn prev_section(&mut self) {
        if let Some(prev) = self.reader.prev_ref().map(str::to_string) {
            self.open_reference(&prev);
        }
    }

    /// Jump `delta` chapters within the book being read
    pub fn jump_chapter(&mut self, delta: isize) {
        let Some(current) = self.reader.requested().map(str::to_string) else {
            return;
        };
        let last = if self.reader_chapters > 0 {
            self.reader_chapters
        } else {
            reference::MAX_CHAPTER_RANGE
        };
        let target = reference::chapter(&current)
            .saturating_add_signed(delta)
            .clamp(1, last);
        if target != reference::chapter(&current) {
            let book = self
                .reader_book
                .clone()
                .unwrap_or_else(|| reference::book_title(&current).to_string());
            self.open_reference(&reference::chapter_ref(&book, target));
        }
    }

    // Display preferences

    pub fn cycle_layout(&mut self) {
        self.reader.settings.cycle_layout();
        self.reader.clear_selection();
        self.save_preferences();
    }

    pub fn toggle_vowels(&mut self) {
        self.reader.settings.toggle_vowels();
        self.save_preferences();
    }

    pub fn change_font(&mut self, larger: bool) {
        if larger {
            self.reader.settings.increase_font();
        } else {
            self.reader.settings.decrease_font();
        }
        self.save_preferences();
    }

    pub fn toggle_language(&mut self) {
        self.language = self.language.toggle();
        self.save_preferences();
    }

    fn save_preferences(&mut self) {
        self.config.remember_display(&self.reader.settings);
        self.config.language = self.language;
        if let Err(err) = self.config.save() {
            warn!(error = %err, "could not save preferences");
            self.status = Some(format!("Could not save preferences: {}", err));
        }
    }

    // Outline

    pub fn outline_len(&self) -> usize {
        tree::outline(&self.tree, &self.expansion, DEFAULT_MAX_DEPTH).len()
    }

    pub fn outline_down(&mut self) {
        let len = self.outline_len();
        if len > 0 {
            let i = self.outline_state.selected().unwrap_or(0);
            self.outline_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn outline_up(&mut self) {
        let i = self.outline_state.selected().unwrap_or(0);
        self.outline_state.select(Some(i.saturating_sub(1)));
    }

    /// Toggle a category, or open the first chapter of a work
    pub fn outline_activate(&mut self) {
        let Some(index) = self.outline_state.selected() else {
            return;
        };
        let rows = tree::outline(&self.tree, &self.expansion, DEFAULT_MAX_DEPTH);
        let Some(row) = rows.get(index) else {
            return;
        };

        if row.node.is_leaf {
            if let Some(title) = row.node.work_title.clone() {
                self.open_reference(&reference::chapter_ref(&title, 1));
            }
        } else {
            let key = row.key.clone();
            self.expansion.toggle(&key);
        }
    }

    pub fn outline_expand_all(&mut self) {
        self.expansion.expand_all(&self.tree);
    }

    pub fn outline_collapse_all(&mut self) {
        self.expansion.collapse_all(&self.tree);
        self.outline_state.select(Some(0));
    }

    // Search

    pub fn search_input_changed(&mut self) {
        if let Some(task) = self.search_task.take() {
            task.abort();
        }
        let Some(ticket) = self.search.on_input(&self.search_input) else {
            self.search_state.select(None);
            return;
        };
        let api = self.api.clone();
        let events = self.events.clone();
        self.search_task = Some(tokio::spawn(async move {
            let result = search::run_debounced(&api, &ticket).await;
            let _ = events.send(AppEvent::Task(TaskResult::Search(ticket, result)));
        }));
    }

    pub fn search_down(&mut self) {
        let len = self.search.results().map_or(0, |r| r.hits.len());
        if len > 0 {
            let i = self.search_state.selected().unwrap_or(0);
            self.search_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn search_up(&mut self) {
        let i = self.search_state.selected().unwrap_or(0);
        self.search_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_search_hit(&mut self) {
        let hit = self
            .search_state
            .selected()
            .and_then(|i| self.search.results()?.hits.get(i))
            .map(|hit| hit.reference.clone());
        if let Some(reference) = hit {
            self.open_reference(&reference);
        }
    }

    pub fn tick(&mut self) {
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % 3;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.library_loading
            || self.nav.is_loading_chapters()
            || self.reader.is_loading()
            || self.search.is_pending()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{offline_app, sample_library};
    use super::*;

    #[tokio::test]
    async fn test_library_load_resets_lists() {
        let (mut app, _rx) = offline_app();
        app.apply(TaskResult::Library(Ok(sample_library())));

        assert!(!app.library_loading);
        assert_eq!(app.list_state.selected(), Some(0));
        assert_eq!(app.list_len(), 2);
        assert_eq!(app.outline_len(), 4);
        assert_eq!(app.tree.len(), 2);
        assert_eq!(tree::leaf_count(&app.tree), 3);
    }

    #[tokio::test]
    async fn test_tree_is_rebuilt_only_with_the_library() {
        let (mut app, _rx) = offline_app();
        app.apply(TaskResult::Library(Ok(sample_library())));
        let built = app.tree.clone();

        app.outline_state.select(Some(0));
        app.outline_activate();
        app.outline_expand_all();
        app.select_current();
        assert_eq!(app.tree, built);

        app.apply(TaskResult::Library(Ok(serde_json::from_str(r#"[{"title": "Ruth"}]"#).unwrap())));
        assert_eq!(app.tree.len(), 1);
        assert_eq!(app.tree[0].work_title.as_deref(), Some("Ruth"));
    }

    #[tokio::test]
    async fn test_popular_texts_open_directly() {
        let (mut app, _rx) = offline_app();
        app.apply(TaskResult::Library(Ok(sample_library())));

        app.open_popular(7);
        assert_eq!(app.nav.screen(), Screen::Reading);
        assert_eq!(app.reader.requested(), Some("Song of Songs 1:1"));
        assert_eq!(app.nav.recently_viewed()[0], "Song of Songs 1:1");

        // Past the end of the list
        app.open_popular(8);
        assert_eq!(app.reader.requested(), Some("Song of Songs 1:1"));
    }

    #[tokio::test]
    async fn test_library_failure_is_reported() {
        let (mut app, _rx) = offline_app();
        app.load_library();
        app.apply(TaskResult::Library(Err(ApiError::InvalidResponse {
            operation: "get_library",
            input: String::new(),
            detail: "expected a JSON array".to_string(),
        })));

        assert!(!app.library_loading);
        assert!(app.status.as_deref().is_some_and(|s| s.contains("retry")));
        assert!(app.nav.library().is_empty());
    }

    #[tokio::test]
    async fn test_outline_toggles_and_opens_works() {
        let (mut app, _rx) = offline_app();
        app.apply(TaskResult::Library(Ok(sample_library())));
        app.view = View::Outline;

        app.outline_state.select(Some(1));
        app.outline_activate();
        assert_eq!(app.outline_len(), 5);

        app.outline_down();
        app.outline_activate();
        assert_eq!(app.view, View::Browse);
        assert_eq!(app.nav.screen(), Screen::Reading);
        assert_eq!(app.reader.requested(), Some("Genesis 1"));
        assert_eq!(app.nav.recently_viewed()[0], "Genesis 1");

        app.outline_collapse_all();
        assert_eq!(app.outline_len(), 4);
    }

    #[tokio::test]
    async fn test_drilling_and_home() {
        let (mut app, _rx) = offline_app();
        app.apply(TaskResult::Library(Ok(sample_library())));

        app.select_current();
        assert_eq!(app.nav.breadcrumb(Language::En), vec!["Tanakh"]);
        app.list_down();
        assert_eq!(app.highlighted_item().and_then(|n| n.title.as_deref()), Some("Psalms"));

        app.open_recent(1);
        assert_eq!(app.reader.requested(), Some("Psalms 23"));

        app.go_home();
        assert_eq!(app.nav.screen(), Screen::Library);
        assert!(app.reader.requested().is_none());
        assert_eq!(app.list_len(), 2);
    }
}
