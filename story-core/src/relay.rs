//! Stream relay: forwards generated text to a sink as it arrives.
//!
//! The relay owns no presentation concerns. Pacing (the typing effect) and
//! transport (stdout, websocket) belong to the sink.

use async_trait::async_trait;
use futures::StreamExt;
use ollama::{GenerateChunk, GenerateRequest, Ollama};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::StoryConfig;

/// The single failure a relay reports: the request itself did not succeed.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Inference endpoint error: {0}")]
    Endpoint(#[from] ollama::Error),

    #[error("Generation failed: {0}")]
    Other(String),
}

/// Consumer of streamed text fragments.
///
/// `emit` is awaited before the next fragment is read, so a slow sink slows
/// the relay down rather than queueing text.
#[async_trait]
pub trait ChunkSink: Send {
    async fn emit(&mut self, chunk: &str);
}

#[async_trait]
impl<'a, S> ChunkSink for &'a mut S
where
    S: ChunkSink + ?Sized,
{
    async fn emit(&mut self, chunk: &str) {
        (**self).emit(chunk).await
    }
}

/// Collects every fragment.
#[async_trait]
impl ChunkSink for Vec<String> {
    async fn emit(&mut self, chunk: &str) {
        self.push(chunk.to_string());
    }
}

/// Forwards fragments over a bounded channel. A closed receiver drops them.
#[async_trait]
impl ChunkSink for mpsc::Sender<String> {
    async fn emit(&mut self, chunk: &str) {
        let _ = self.send(chunk.to_string()).await;
    }
}

/// Discards every fragment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ChunkSink for NullSink {
    async fn emit(&mut self, _chunk: &str) {}
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

#[async_trait]
impl<F> ChunkSink for FnSink<F>
where
    F: FnMut(&str) + Send,
{
    async fn emit(&mut self, chunk: &str) {
        (self.0)(chunk)
    }
}

/// Stream one generation for `prompt`, forwarding each fragment to `sink`.
///
/// Returns the concatenated text once the endpoint closes the stream. Lines
/// that do not decode, or carry no `response`, are skipped. An empty
/// `response` (Ollama sends one with the final `done` line) is not forwarded
/// to the sink. Any request-level failure aborts immediately and the partial
/// text is discarded.
pub async fn stream_generate<S>(
    client: &Ollama,
    prompt: &str,
    sink: &mut S,
) -> Result<String, RequestError>
where
    S: ChunkSink + ?Sized,
{
    let mut stream = client
        .generate_stream(GenerateRequest::new(prompt))
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "generate request failed"))?;

    let mut text = String::new();
    let mut skipped = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(GenerateChunk {
                response: Some(fragment),
                ..
            }) => {
                if fragment.is_empty() {
                    continue;
                }
                text.push_str(&fragment);
                sink.emit(&fragment).await;
            }
            Ok(GenerateChunk { error, .. }) => {
                skipped += 1;
                match error {
                    Some(error) => tracing::warn!(%error, "endpoint reported an error line"),
                    None => tracing::debug!("skipping line without response"),
                }
            }
            Err(e) if e.is_line_error() => {
                skipped += 1;
                tracing::debug!(error = %e, "skipping malformed line");
            }
            Err(e) => {
                tracing::warn!(error = %e, chars = text.len(), "stream aborted");
                return Err(e.into());
            }
        }
    }

    tracing::debug!(chars = text.len(), skipped, "stream complete");
    Ok(text)
}

/// Something that turns a prompt into text, streaming it to a sink.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<String, RequestError>;
}

/// [`Generate`] backed by a live Ollama server.
#[derive(Clone)]
pub struct OllamaRelay {
    client: Ollama,
}

impl OllamaRelay {
    pub fn new(client: Ollama) -> Self {
        Self { client }
    }

    pub fn from_config(config: &StoryConfig) -> Result<Self, ollama::Error> {
        Ok(Self::new(config.client()?))
    }

    pub fn client(&self) -> &Ollama {
        &self.client
    }
}

#[async_trait]
impl Generate for OllamaRelay {
    async fn generate(
        &self,
        prompt: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<String, RequestError> {
        stream_generate(&self.client, prompt, sink).await
    }
}
