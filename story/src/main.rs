//! Interactive story generator for the terminal.
//!
//! Streams a choose-your-path story from a local Ollama model. Configuration
//! comes from the environment (or `.env`) and can be overridden by flags:
//!
//! ```bash
//! cargo run -p story -- --model llama3.2:3b --genre "space western"
//! ```

mod console;
mod play;

use clap::Parser;
use ollama::Ollama;
use std::path::PathBuf;
use std::time::Duration;
use story_core::{StoryConfig, Storyteller};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive choose-your-path stories from a local Ollama model")]
struct Cli {
    /// Ollama API base URL [env: OLLAMA_URL]
    #[arg(long)]
    url: Option<String>,

    /// Model to generate with [env: OLLAMA_MODEL]
    #[arg(short, long)]
    model: Option<String>,

    /// Delay between printed characters, 0 to disable [env: STORY_TYPING_DELAY_MS]
    #[arg(long)]
    typing_delay_ms: Option<u64>,

    /// Directory saved stories are written to [env: STORIES_DIR]
    #[arg(long)]
    stories_dir: Option<PathBuf>,

    /// Start straight away with this genre
    #[arg(short, long)]
    genre: Option<String>,
}

impl Cli {
    fn apply(&self, mut config: StoryConfig) -> StoryConfig {
        if let Some(url) = &self.url {
            config = config.with_base_url(url);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(ms) = self.typing_delay_ms {
            config = config.with_typing_delay(Duration::from_millis(ms));
        }
        if let Some(dir) = &self.stories_dir {
            config = config.with_stories_dir(dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr and stay quiet by default so they don't break up the story.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.apply(StoryConfig::from_env()?);
    let teller = Storyteller::from_config(&config)?;
    check_connection(teller.generator().client()).await;

    let mut input = play::Input::stdin();
    play::run(&teller, &config, cli.genre, &mut input).await
}

/// Warn early if the server is down or the model is missing.
async fn check_connection(client: &Ollama) {
    match client.list_models().await {
        Ok(models) => {
            let model = client.model();
            let installed = models
                .iter()
                .any(|m| m.name == model || m.name.strip_suffix(":latest") == Some(model));
            if installed {
                tracing::debug!(model, "model available");
            } else {
                tracing::warn!(model, "model not installed, try `ollama pull {model}`");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, url = client.base_url(), "Ollama server not reachable");
        }
    }
}
