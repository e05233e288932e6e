//! Testing utilities for story play.
//!
//! `ScriptedGenerator` stands in for a live model so storyteller and
//! front-end logic can be exercised deterministically without a server.

use crate::relay::{ChunkSink, Generate, RequestError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A generator that replays scripted responses in order.
///
/// Each response is streamed to the sink word by word. Every prompt it
/// receives is recorded for later assertions.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Create a generator that returns `responses` in order.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another successful response.
    pub fn then_respond(self, text: impl Into<String>) -> Self {
        self.queue(Ok(text.into()));
        self
    }

    /// Queue a failed request.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.queue(Err(message.into()));
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    fn queue(&self, response: Result<String, String>) {
        lock(&self.responses).push_back(response);
    }
}

#[async_trait]
impl Generate for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        sink: &mut (dyn ChunkSink + '_),
    ) -> Result<String, RequestError> {
        lock(&self.prompts).push(prompt.to_string());

        let next = lock(&self.responses).pop_front();
        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(RequestError::Other(message)),
            None => {
                return Err(RequestError::Other(
                    "no more scripted responses".to_string(),
                ))
            }
        };

        for word in text.split_inclusive(' ') {
            sink.emit(word).await;
        }

        Ok(text)
    }
}

// Poisoning is ignored: the scripted data stays valid after a panicking test.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let generator = ScriptedGenerator::new(["one two"]).then_respond("three");
        let mut sink: Vec<String> = Vec::new();

        assert_eq!(generator.generate("p1", &mut sink).await.unwrap(), "one two");
        assert_eq!(sink, vec!["one ".to_string(), "two".to_string()]);

        assert_eq!(generator.generate("p2", &mut sink).await.unwrap(), "three");
        assert_eq!(generator.prompts(), vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(generator.remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_and_failures() {
        let generator = ScriptedGenerator::default().then_fail("offline");
        let mut sink: Vec<String> = Vec::new();

        let err = generator.generate("p", &mut sink).await.unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert!(generator.generate("p", &mut sink).await.is_err());
        assert!(sink.is_empty());
    }
}
