//! The interactive story loop.
//!
//! Line-oriented: the reader picks a genre (or asks for `help`), then answers
//! each turn with a choice letter. `SAVE` writes the story file and `E` or
//! `STOP` ends it. Ctrl-C ends the current story.

use crate::console::{choices_hint, ConsoleSink};
use std::future::Future;
use std::io::{self, Write};
use story_core::{Generate, StoryConfig, StorySession, Storyteller};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

const GENRE_QUESTION: &str =
    "\nEnter the genre for your interactive story (or 'help' for suggestions): ";
const CHOICE_QUESTION: &str = "\nEnter the letter of your choice (or 'save' to save the story): ";
const AGAIN_QUESTION: &str = "\nWould you like to create another story? (yes/no): ";

/// What the reader typed at the choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Stop,
    Save,
    Choose(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim().to_uppercase();
        match input.as_str() {
            "" => Command::Empty,
            "E" | "STOP" => Command::Stop,
            "SAVE" => Command::Save,
            _ => Command::Choose(input),
        }
    }
}

/// Line reader that gives up on end of input or Ctrl-C.
pub struct Input<R> {
    lines: Lines<R>,
}

impl Input<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Print `question` and read one line. `None` means the reader left.
    pub async fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}");
        io::stdout().flush()?;

        tokio::select! {
            line = self.lines.next_line() => line,
            _ = ctrl_c() => Ok(None),
        }
    }
}

/// Play stories until the reader declines another one.
pub async fn run<G, R>(
    teller: &Storyteller<G>,
    config: &StoryConfig,
    mut genre: Option<String>,
    input: &mut Input<R>,
) -> anyhow::Result<()>
where
    G: Generate,
    R: AsyncBufRead + Unpin,
{
    println!("Welcome to the Interactive Story Generator!");

    loop {
        let genre = match genre.take() {
            Some(genre) => genre,
            None => {
                let Some(answer) = input.ask(GENRE_QUESTION).await? else {
                    break;
                };
                let answer = answer.trim().to_lowercase();
                if answer.is_empty() {
                    continue;
                }
                if answer == "help" {
                    suggest_genres(teller, config).await;
                    continue;
                }
                answer
            }
        };

        play_story(teller, config, &genre, input).await?;

        let Some(again) = input.ask(AGAIN_QUESTION).await? else {
            break;
        };
        if !matches!(again.trim().to_lowercase().as_str(), "yes" | "y") {
            break;
        }
    }

    println!("\nThank you for using the Interactive Story Generator. Goodbye!");
    Ok(())
}

async fn suggest_genres<G: Generate>(teller: &Storyteller<G>, config: &StoryConfig) {
    println!("\nHere are some genre suggestions:\n");
    let mut sink = ConsoleSink::stdout(config.typing_delay);
    match interruptible(teller.suggest_genres(&mut sink)).await {
        Some(Ok(_)) => println!(),
        Some(Err(e)) => println!("\nError connecting to Ollama: {e}"),
        None => println!(),
    }
}

/// Play one story from its opening turn until the reader stops.
pub async fn play_story<G, R>(
    teller: &Storyteller<G>,
    config: &StoryConfig,
    genre: &str,
    input: &mut Input<R>,
) -> anyhow::Result<Option<StorySession>>
where
    G: Generate,
    R: AsyncBufRead + Unpin,
{
    println!("\nGenerating an interactive {genre} story...\n");
    let mut sink = ConsoleSink::stdout(config.typing_delay);

    let mut session = match interruptible(StorySession::start(teller, genre, &mut sink)).await {
        Some(Ok(session)) => session,
        Some(Err(e)) => {
            println!("\nError connecting to Ollama: {e}");
            return Ok(None);
        }
        None => {
            println!("\n\nStory ended.");
            return Ok(None);
        }
    };
    println!("\n\n{}", choices_hint(session.choices()));

    loop {
        let Some(line) = input.ask(CHOICE_QUESTION).await? else {
            println!("\n\nStory ended.");
            break;
        };

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Stop => {
                println!("\nStory ended. Thank you for playing!");
                break;
            }
            Command::Save => match session.save(&config.stories_dir).await {
                Ok(path) => println!("\nStory saved successfully to {}", path.display()),
                Err(e) => println!("\nError saving story: {e}"),
            },
            Command::Choose(letter) => {
                println!();
                let outcome = interruptible(session.choose(teller, &letter, &mut sink))
                    .await
                    .map(|result| result.map(|_| ()));
                match outcome {
                    Some(Ok(())) => println!("\n\n{}", choices_hint(session.choices())),
                    Some(Err(e)) => println!("\nError connecting to Ollama: {e}"),
                    None => {
                        println!("\n\nStory ended.");
                        break;
                    }
                }
            }
        }
    }

    Ok(Some(session))
}

/// Run `fut` unless Ctrl-C arrives first.
async fn interruptible<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = ctrl_c() => None,
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never interrupt.
        std::future::pending::<()>().await;
    }
}
