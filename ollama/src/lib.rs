//! Minimal Ollama API client.
//!
//! This crate provides a focused client for Ollama's `/api` routes with:
//! - Streaming and one-shot text generation
//! - Model listing (doubles as a connection check)
//! - Newline-delimited JSON parsing that survives arbitrary chunk boundaries

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::Stream;

/// Default base URL of a local Ollama server, including the `/api` prefix.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434/api";
/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Longest silence tolerated between reads. Loading a model can take a while
/// before the first token arrives.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors that can occur when using the Ollama client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is confined to a single streamed line.
    ///
    /// Line-level errors leave the rest of the stream intact; every other
    /// variant means the request itself failed.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

/// A boxed stream of generation chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateChunk, Error>> + Send>>;

/// Ollama API client.
#[derive(Clone)]
pub struct Ollama {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl Ollama {
    /// Create a new client against the given base URL (e.g. `http://127.0.0.1:11434/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(DEFAULT_READ_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Replace the read timeout; a stalled response fails with `Error::Network`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Create a client from the `OLLAMA_URL` and `OLLAMA_MODEL` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = Self::new(base_url)?;
        Ok(match std::env::var("OLLAMA_MODEL") {
            Ok(model) if !model.trim().is_empty() => client.with_model(model),
            _ => client,
        })
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a generate request and return the full response in one piece.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Error> {
        let api_request = self.build_api_request(&request, false);

        let response = self
            .client
            .post(self.url("generate"))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let api_response: ApiGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(GenerateResponse {
            model: api_response.model,
            response: api_response.response,
            done: api_response.done,
        })
    }

    /// Send a generate request and stream the response.
    ///
    /// Each item is one decoded line of the newline-delimited JSON body. A
    /// line that fails to decode yields `Err(Error::Parse)` and the stream
    /// continues; a transport failure yields `Err(Error::Network)`.
    pub async fn generate_stream(&self, request: GenerateRequest) -> Result<ChunkStream, Error> {
        let api_request = self.build_api_request(&request, true);
        tracing::debug!(model = %api_request.model, url = %self.url("generate"), "opening generate stream");

        let response = self
            .client
            .post(self.url("generate"))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = check_status(response).await?;

        // `None` marks end of body so the last line is flushed even without a newline
        let stream = response
            .bytes_stream()
            .map(Some)
            .chain(futures::stream::once(async { None }))
            .scan(Vec::new(), |buffer, item| {
                let chunks = match item {
                    Some(Ok(bytes)) => {
                        buffer.extend_from_slice(&bytes);
                        parse_ndjson_buffered(buffer)
                    }
                    Some(Err(e)) => vec![Err(Error::Network(e.to_string()))],
                    None => flush_ndjson(buffer),
                };
                futures::future::ready(Some(chunks))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(stream))
    }

    /// List the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, Error> {
        let response = self
            .client
            .get(self.url("tags"))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let tags: ApiTags = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(tags.models)
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{route}", self.base_url)
    }

    fn build_api_request(&self, request: &GenerateRequest, stream: bool) -> ApiGenerateRequest {
        ApiGenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream,
        }
    }
}

fn build_client(read_timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .read_timeout(read_timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(Error::Api { status, message })
}

// ============================================================================
// Public types
// ============================================================================

/// A generation request. The model is the client's.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
}

impl GenerateRequest {
    /// Create a new request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// One line of a streamed generate response.
///
/// Every field is optional on the wire; only `response` carries text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A complete (non-streamed) generate response.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    pub done: bool,
}

/// A model installed on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ApiTags {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Parse complete NDJSON lines from a buffer, leaving any partial line behind.
///
/// The buffer holds raw bytes so a multi-byte character split across two
/// network chunks is only decoded once its line is complete.
fn parse_ndjson_buffered(buffer: &mut Vec<u8>) -> Vec<Result<GenerateChunk, Error>> {
    let mut chunks = Vec::new();

    while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        if let Some(chunk) = decode_line(&line[..newline_pos]) {
            chunks.push(chunk);
        }
    }

    chunks
}

/// Decode whatever is left in the buffer once the body has ended.
fn flush_ndjson(buffer: &mut Vec<u8>) -> Vec<Result<GenerateChunk, Error>> {
    let rest = std::mem::take(buffer);
    decode_line(&rest).into_iter().collect()
}

fn decode_line(line: &[u8]) -> Option<Result<GenerateChunk, Error>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    Some(
        serde_json::from_slice::<GenerateChunk>(line)
            .map_err(|e| Error::Parse(format!("NDJSON line: {e}"))),
    )
}
