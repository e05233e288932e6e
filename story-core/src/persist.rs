//! Saving finished stories as plain-text files.

use crate::narrative::{render_story, StoryHistory};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to save: the story has no turns yet")]
    EmptyStory,
}

/// File name for a story saved at `now`: `{genre}_story_{YYYYmmdd_HHMMSS}.txt`.
pub fn story_file_name(genre: &str, now: DateTime<Local>) -> String {
    let sanitized = genre
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    format!("{sanitized}_story_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

/// Write the story to a timestamped file in `dir`, creating `dir` if needed.
///
/// Returns the path of the written file.
pub async fn save_story(
    dir: impl AsRef<Path>,
    genre: &str,
    history: &StoryHistory,
) -> Result<PathBuf, PersistError> {
    if history.is_empty() {
        return Err(PersistError::EmptyStory);
    }

    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;

    let path = dir.join(story_file_name(genre, Local::now()));
    fs::write(&path, render_story(genre, history)).await?;

    tracing::info!(path = %path.display(), turns = history.len(), "story saved");
    Ok(path)
}
