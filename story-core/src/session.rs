//! Storyteller and StorySession - the primary public API for story play.
//!
//! [`Storyteller`] turns prompts into story turns and holds no narrative
//! state: history goes in as an argument and the new segment comes back out.
//! [`StorySession`] is the caller-side record of one story (genre, history,
//! latest choices) that front-ends keep per terminal or per connection.

use crate::choices::{extract_choices, ChoiceMap};
use crate::config::StoryConfig;
use crate::narrative::{NarrativeSegment, StoryHistory};
use crate::persist::{save_story, PersistError};
use crate::prompts::{continuation_prompt, genre_help_prompt, start_prompt};
use crate::relay::{ChunkSink, Generate, OllamaRelay, RequestError};
use std::path::{Path, PathBuf};

/// Result of one generation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// The full generated text of the turn.
    pub segment: NarrativeSegment,

    /// Choices parsed from this turn's text, if any were offered.
    pub choices: Option<ChoiceMap>,
}

impl Turn {
    /// Build a turn from generated text, parsing its choice block.
    pub fn from_text(text: String) -> Self {
        let choices = extract_choices(&text);
        Self {
            segment: NarrativeSegment::from(text),
            choices,
        }
    }

    /// Whether the model ended the story without offering choices.
    pub fn is_final(&self) -> bool {
        self.choices.is_none()
    }
}

/// Drives story generation through any [`Generate`] backend.
pub struct Storyteller<G> {
    generator: G,
}

impl Storyteller<OllamaRelay> {
    /// Create a storyteller talking to the Ollama server in `config`.
    pub fn from_config(config: &StoryConfig) -> Result<Self, ollama::Error> {
        Ok(Self::new(OllamaRelay::from_config(config)?))
    }
}

impl<G: Generate> Storyteller<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Generate the opening turn of a story in `genre`.
    pub async fn begin(
        &self,
        genre: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<Turn, RequestError> {
        tracing::info!(genre, "starting story");
        let text = self.generator.generate(&start_prompt(genre), sink).await?;
        Ok(Turn::from_text(text))
    }

    /// Generate the turn that follows `history` after the reader chose `letter`.
    pub async fn continue_story(
        &self,
        genre: &str,
        history: &StoryHistory,
        letter: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<Turn, RequestError> {
        tracing::info!(genre, letter, turn = history.len() + 1, "continuing story");
        let prompt = continuation_prompt(genre, &history.joined(), letter);
        let text = self.generator.generate(&prompt, sink).await?;
        Ok(Turn::from_text(text))
    }

    /// Stream a list of genre suggestions.
    pub async fn suggest_genres(
        &self,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<String, RequestError> {
        self.generator.generate(genre_help_prompt(), sink).await
    }
}

/// One reader's story: genre, narrative so far and the choices on offer.
#[derive(Debug, Clone, PartialEq)]
pub struct StorySession {
    genre: String,
    history: StoryHistory,
    choices: Option<ChoiceMap>,
}

impl StorySession {
    /// An empty session for `genre`; nothing has been generated yet.
    pub fn new(genre: impl Into<String>) -> Self {
        Self {
            genre: genre.into(),
            history: StoryHistory::new(),
            choices: None,
        }
    }

    /// Generate the opening turn and return a session holding it.
    pub async fn start<G: Generate>(
        teller: &Storyteller<G>,
        genre: impl Into<String>,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<Self, RequestError> {
        let mut session = Self::new(genre);
        let turn = teller.begin(&session.genre, sink).await?;
        session.record(turn);
        Ok(session)
    }

    /// Generate the next turn for `letter` and append it.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn choose<G: Generate>(
        &mut self,
        teller: &Storyteller<G>,
        letter: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<&NarrativeSegment, RequestError> {
        let turn = teller
            .continue_story(&self.genre, &self.history, letter, sink)
            .await?;
        Ok(self.record(turn))
    }

    /// Append a completed turn; its choices replace the previous ones.
    pub fn record(&mut self, turn: Turn) -> &NarrativeSegment {
        self.choices = turn.choices;
        self.history.push(turn.segment)
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn history(&self) -> &StoryHistory {
        &self.history
    }

    /// Choices parsed from the most recent turn.
    pub fn choices(&self) -> Option<&ChoiceMap> {
        self.choices.as_ref()
    }

    pub fn latest(&self) -> Option<&NarrativeSegment> {
        self.history.latest()
    }

    /// Save the story so far under `dir`.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, PersistError> {
        save_story(dir, &self.genre, &self.history).await
    }
}
