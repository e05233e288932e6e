//! Choice-driven story engine over a local Ollama server.
//!
//! This crate provides:
//! - Prompt builders for opening and continuing a story
//! - A stream relay that forwards generated text to any sink as it arrives
//! - A forgiving parser for the A-E choice block at the end of each turn
//! - Narrative history and plain-text story files
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{NullSink, StoryConfig, StorySession, Storyteller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryConfig::from_env()?;
//!     let teller = Storyteller::from_config(&config)?;
//!
//!     let mut session = StorySession::start(&teller, "fantasy", &mut NullSink).await?;
//!     println!("{:?}", session.choices());
//!
//!     session.choose(&teller, "A", &mut NullSink).await?;
//!     session.save(&config.stories_dir).await?;
//!     Ok(())
//! }
//! ```

pub mod choices;
pub mod config;
pub mod narrative;
pub mod persist;
pub mod prompts;
pub mod relay;
pub mod session;
pub mod testing;

// Primary public API
pub use choices::{extract_choices, ChoiceMap, STOP_LETTER};
pub use config::{ConfigError, StoryConfig};
pub use narrative::{render_story, strip_choice_block, NarrativeSegment, StoryHistory};
pub use persist::{save_story, PersistError};
pub use relay::{
    stream_generate, ChunkSink, FnSink, Generate, NullSink, OllamaRelay, RequestError,
};
pub use session::{StorySession, Storyteller, Turn};
pub use testing::ScriptedGenerator;
