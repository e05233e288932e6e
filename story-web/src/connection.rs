//! Per-connection story state and message handling.
//!
//! Each websocket gets its own [`Connection`]; outgoing messages go through a
//! bounded channel drained by the socket writer task.

use crate::protocol::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use std::sync::Arc;
use story_core::{ChunkSink, Generate, NullSink, StorySession, Storyteller};
use tokio::sync::mpsc;

/// Forwards streamed fragments as `story_stream` events.
pub struct SocketSink {
    outbox: mpsc::Sender<ServerMessage>,
}

impl SocketSink {
    pub fn new(outbox: mpsc::Sender<ServerMessage>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl ChunkSink for SocketSink {
    async fn emit(&mut self, chunk: &str) {
        let message = ServerMessage::StoryStream {
            text: chunk.to_string(),
        };
        // The reader is gone when this fails; generation finishes unobserved.
        let _ = self.outbox.send(message).await;
    }
}

pub struct Connection<G> {
    teller: Arc<Storyteller<G>>,
    session: Option<StorySession>,
    outbox: mpsc::Sender<ServerMessage>,
}

impl<G: Generate> Connection<G> {
    pub fn new(teller: Arc<Storyteller<G>>, outbox: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            teller,
            session: None,
            outbox,
        }
    }

    pub fn session(&self) -> Option<&StorySession> {
        self.session.as_ref()
    }

    /// Decode and handle one text frame.
    pub async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable client message");
                self.send(ServerMessage::error(format!("Invalid message: {e}")))
                    .await;
            }
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) {
        let reply = match message {
            ClientMessage::GetGenreHelp => self.genre_help().await,
            ClientMessage::StartStory { genre } => self.start_story(genre).await,
            ClientMessage::MakeChoice { choice } => self.make_choice(&choice).await,
        };
        self.send(reply).await;
    }

    async fn genre_help(&self) -> ServerMessage {
        match self.teller.suggest_genres(&mut NullSink).await {
            Ok(genres) => ServerMessage::GenreHelp { genres },
            Err(e) => ServerMessage::error(e.to_string()),
        }
    }

    async fn start_story(&mut self, genre: String) -> ServerMessage {
        let mut sink = SocketSink::new(self.outbox.clone());
        match StorySession::start(&self.teller, genre, &mut sink).await {
            Ok(session) => {
                let story = session.latest().map(ToString::to_string).unwrap_or_default();
                let choices = session.choices().cloned();
                self.session = Some(session);
                ServerMessage::StoryStarted { story, choices }
            }
            Err(e) => ServerMessage::error(e.to_string()),
        }
    }

    async fn make_choice(&mut self, choice: &str) -> ServerMessage {
        let Some(session) = self.session.as_mut() else {
            return ServerMessage::error("No story in progress. Start a story first.");
        };

        let mut sink = SocketSink::new(self.outbox.clone());
        let outcome = session
            .choose(&self.teller, choice, &mut sink)
            .await
            .map(|segment| segment.to_string());

        match outcome {
            Ok(story) => ServerMessage::StoryContinued {
                story,
                choices: session.choices().cloned(),
            },
            Err(e) => ServerMessage::error(e.to_string()),
        }
    }

    async fn send(&self, message: ServerMessage) {
        if self.outbox.send(message).await.is_err() {
            tracing::debug!("socket writer gone, dropping message");
        }
    }
}
