//! Reader state for one open reference.
//!
//! Text loads are ticketed: only the most recent [`ReaderState::begin_load`]
//! may land, so a slow response for a reference the user already left is
//! dropped instead of replacing what is on screen.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::LibraryApi;
use crate::error::Result;
use crate::model::{TextOptions, TextPayload};
use crate::verses::{self, RenderMode, RenderedText};

pub const DEFAULT_FONT_SIZE: u16 = 18;
pub const MIN_FONT_SIZE: u16 = 12;
pub const MAX_FONT_SIZE: u16 = 32;
pub const FONT_STEP: u16 = 2;
/// Source text renders this much larger than the translation
pub const SOURCE_FONT_BONUS: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub layout: RenderMode,
    pub font_size: u16,
    pub show_vowels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            layout: RenderMode::Stacked,
            font_size: DEFAULT_FONT_SIZE,
            show_vowels: true,
        }
    }
}

impl DisplaySettings {
    /// Clamp values read from outside into range
    pub fn normalized(mut self) -> Self {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }

    pub fn increase_font(&mut self) {
        self.font_size = (self.font_size + FONT_STEP).min(MAX_FONT_SIZE);
    }

    pub fn decrease_font(&mut self) {
        self.font_size = self.font_size.saturating_sub(FONT_STEP).max(MIN_FONT_SIZE);
    }

    pub fn source_font_size(&self) -> u16 {
        self.font_size + SOURCE_FONT_BONUS
    }

    pub fn toggle_vowels(&mut self) {
        self.show_vowels = !self.show_vowels;
    }

    pub fn cycle_layout(&mut self) {
        self.layout = self.layout.next();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTicket {
    pub reference: String,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReaderState {
    pub settings: DisplaySettings,
    requested: Option<String>,
    payload: Option<TextPayload>,
    loading: bool,
    error: Option<String>,
    selected_verse: Option<usize>,
    generation: u64,
}

impl ReaderState {
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            settings: settings.normalized(),
            ..Self::default()
        }
    }

    pub fn begin_load(&mut self, reference: &str) -> TextTicket {
        self.generation += 1;
        self.requested = Some(reference.to_string());
        self.loading = true;
        self.error = None;
        self.selected_verse = None;
        TextTicket {
            reference: reference.to_string(),
            generation: self.generation,
        }
    }

    /// Apply a load result; false when the ticket was superseded
    pub fn finish_load(&mut self, ticket: &TextTicket, result: Result<TextPayload>) -> bool {
        if ticket.generation != self.generation {
            debug!(reference = %ticket.reference, "discarding superseded text");
            return false;
        }
        self.loading = false;
        match result {
            Ok(payload) => {
                self.payload = Some(payload);
                self.error = None;
            }
            Err(err) => {
                warn!(reference = %ticket.reference, error = %err, "text load failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.requested = None;
        self.payload = None;
        self.loading = false;
        self.error = None;
        self.selected_verse = None;
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    pub fn payload(&self) -> Option<&TextPayload> {
        self.payload.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_verse(&self) -> Option<usize> {
        self.selected_verse
    }

    /// Select a verse, or clear the selection if it is already selected
    pub fn toggle_verse(&mut self, index: usize) {
        self.selected_verse = match self.selected_verse {
            Some(current) if current == index => None,
            _ => Some(index),
        };
    }

    pub fn clear_selection(&mut self) {
        self.selected_verse = None;
    }

    pub fn rendered(&self) -> Option<RenderedText> {
        let payload = self.payload.as_ref()?;
        Some(verses::render(
            payload,
            self.settings.layout,
            self.settings.show_vowels,
        ))
    }

    pub fn popup(&self) -> Option<String> {
        let payload = self.payload.as_ref()?;
        verses::popup_translation(payload, self.settings.layout, self.selected_verse)
    }

    pub fn next_ref(&self) -> Option<&str> {
        self.payload.as_ref()?.next.as_deref()
    }

    pub fn prev_ref(&self) -> Option<&str> {
        self.payload.as_ref()?.prev.as_deref()
    }
}

/// Bilingual text for a reference
pub async fn load_text(api: &LibraryApi, reference: &str) -> Result<TextPayload> {
    api.get_text(reference, &TextOptions::bilingual()).await
}
