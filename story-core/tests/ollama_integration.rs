//! Integration tests that call a real Ollama server.
//!
//! These tests need a running server (`OLLAMA_URL`, default
//! `http://127.0.0.1:11434/api`) with the configured model pulled.
//! Run with: `cargo test -p story-core --test ollama_integration -- --ignored`
//!
//! They are marked #[ignore] by default to avoid:
//! - Test failures when no server is available
//! - Slow test runs (local generation takes seconds)

use story_core::{StoryConfig, StorySession, Storyteller};

fn setup() -> StoryConfig {
    StoryConfig::from_env().expect("valid configuration")
}

/// Check if the server answers at all.
async fn server_available(config: &StoryConfig) -> bool {
    match config.client() {
        Ok(client) => client.list_models().await.is_ok(),
        Err(_) => false,
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -p story-core --test ollama_integration -- --ignored
async fn test_opening_turn_streams_and_offers_choices() {
    let config = setup();
    if !server_available(&config).await {
        eprintln!("Skipping test: Ollama server not reachable at {}", config.base_url);
        return;
    }

    let teller = Storyteller::from_config(&config).expect("client");
    let mut streamed: Vec<String> = Vec::new();
    let session = StorySession::start(&teller, "fantasy", &mut streamed)
        .await
        .expect("model should respond");

    let latest = session.latest().expect("one turn");
    assert!(!latest.as_str().is_empty(), "model should produce text");
    assert_eq!(streamed.concat(), latest.as_str());

    // Small models do not always produce a parseable menu, so only report it
    println!("Opening: {latest}");
    println!("Choices: {:?}", session.choices());
}

#[tokio::test]
#[ignore]
async fn test_genre_suggestions() {
    let config = setup();
    if !server_available(&config).await {
        eprintln!("Skipping test: Ollama server not reachable at {}", config.base_url);
        return;
    }

    let teller = Storyteller::from_config(&config).expect("client");
    let mut streamed: Vec<String> = Vec::new();
    let text = teller
        .suggest_genres(&mut streamed)
        .await
        .expect("model should respond");

    assert!(!text.trim().is_empty());
    assert_eq!(streamed.concat(), text);
}
