//! Terminal output for streamed story text.

use async_trait::async_trait;
use crossterm::style::Stylize;
use std::io::{self, Stdout, Write};
use std::time::Duration;
use story_core::{ChoiceMap, ChunkSink};

/// Writes streamed fragments to a terminal one character at a time.
pub struct ConsoleSink<W = Stdout> {
    out: W,
    delay: Duration,
}

impl ConsoleSink<Stdout> {
    pub fn stdout(delay: Duration) -> Self {
        Self::new(io::stdout(), delay)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, delay: Duration) -> Self {
        Self { out, delay }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> ChunkSink for ConsoleSink<W> {
    async fn emit(&mut self, chunk: &str) {
        // A closed terminal is not worth aborting the story over.
        if self.delay.is_zero() {
            let _ = self.out.write_all(chunk.as_bytes());
            let _ = self.out.flush();
            return;
        }

        let mut buf = [0u8; 4];
        for c in chunk.chars() {
            let _ = self.out.write_all(c.encode_utf8(&mut buf).as_bytes());
            let _ = self.out.flush();
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Short summary line printed under a turn.
pub fn choices_hint(choices: Option<&ChoiceMap>) -> String {
    match choices {
        Some(choices) => {
            let letters: Vec<String> = choices.letters().map(String::from).collect();
            format!("{} {}", "Options:".bold(), letters.join(", "))
        }
        None => format!(
            "{}",
            "No choices were offered. Enter a letter to push on, or E to stop.".dark_grey()
        ),
    }
}
