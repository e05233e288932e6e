//! Runtime configuration shared by the terminal and web front-ends.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TYPING_DELAY_MS: u64 = 20;
const DEFAULT_STORIES_DIR: &str = "stories";

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Configuration for a storytelling front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryConfig {
    /// Base URL of the Ollama API, including the `/api` prefix.
    pub base_url: String,

    /// Model used for every generation.
    pub model: String,

    /// Pause between characters in the typing effect.
    pub typing_delay: Duration,

    /// Directory that saved stories are written to.
    pub stories_dir: PathBuf,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            base_url: ollama::DEFAULT_BASE_URL.to_string(),
            model: ollama::DEFAULT_MODEL.to_string(),
            typing_delay: Duration::from_millis(DEFAULT_TYPING_DELAY_MS),
            stories_dir: PathBuf::from(DEFAULT_STORIES_DIR),
        }
    }
}

impl StoryConfig {
    /// Read configuration from the environment, loading `.env` first if present.
    ///
    /// Recognised variables: `OLLAMA_URL`, `OLLAMA_MODEL`,
    /// `STORY_TYPING_DELAY_MS` and `STORIES_DIR`. Unset or blank values keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("OLLAMA_URL") {
            config.base_url = url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            config.model = model;
        }
        if let Some(raw) = var("STORY_TYPING_DELAY_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "STORY_TYPING_DELAY_MS",
                    value: raw.clone(),
                })?;
            config.typing_delay = Duration::from_millis(millis);
        }
        if let Some(dir) = var("STORIES_DIR") {
            config.stories_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn with_stories_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stories_dir = dir.into();
        self
    }

    /// Build an Ollama client for this configuration.
    pub fn client(&self) -> Result<ollama::Ollama, ollama::Error> {
        Ok(ollama::Ollama::new(&self.base_url)?.with_model(&self.model))
    }
}
