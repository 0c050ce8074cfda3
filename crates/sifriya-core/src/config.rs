use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_BASE_URL;
use crate::fetch::RetryPolicy;
use crate::library::Language;
use crate::reader::{DisplaySettings, DEFAULT_FONT_SIZE};
use crate::verses::RenderMode;

/// User preferences. Library content is never written here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub layout: RenderMode,
    pub font_size: u16,
    pub show_vowels: bool,
    pub language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: policy.timeout.as_secs(),
            max_retries: policy.max_retries,
            layout: RenderMode::default(),
            font_size: DEFAULT_FONT_SIZE,
            show_vowels: true,
            language: Language::default(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Defaults when the file does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            layout: self.layout,
            font_size: self.font_size,
            show_vowels: self.show_vowels,
        }
        .normalized()
    }

    /// Copy reader preferences back before saving
    pub fn remember_display(&mut self, settings: &DisplaySettings) {
        self.layout = settings.layout;
        self.font_size = settings.font_size;
        self.show_vowels = settings.show_vowels;
    }

    /// `<config_dir>/sifriya`, also home to the log file
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("sifriya"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
