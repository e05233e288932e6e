//! Websocket message types, JSON objects tagged by `event`.

use serde::{Deserialize, Serialize};
use story_core::ChoiceMap;

/// Genre used when `start_story` does not name one.
pub const DEFAULT_GENRE: &str = "adventure";

/// Messages sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    GetGenreHelp,
    StartStory {
        #[serde(default = "default_genre")]
        genre: String,
    },
    MakeChoice {
        #[serde(default)]
        choice: String,
    },
}

fn default_genre() -> String {
    DEFAULT_GENRE.to_string()
}

/// Messages sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One streamed fragment of the turn being generated.
    StoryStream { text: String },
    GenreHelp { genres: String },
    StoryStarted {
        story: String,
        choices: Option<ChoiceMap>,
    },
    StoryContinued {
        story: String,
        choices: Option<ChoiceMap>,
    },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages() {
        let help: ClientMessage = serde_json::from_str(r#"{"event":"get_genre_help"}"#).unwrap();
        assert_eq!(help, ClientMessage::GetGenreHelp);

        let start: ClientMessage =
            serde_json::from_str(r#"{"event":"start_story","genre":"horror"}"#).unwrap();
        assert_eq!(start, ClientMessage::StartStory { genre: "horror".into() });

        let choice: ClientMessage =
            serde_json::from_str(r#"{"event":"make_choice","choice":"B"}"#).unwrap();
        assert_eq!(choice, ClientMessage::MakeChoice { choice: "B".into() });
    }

    #[test]
    fn test_start_story_defaults_genre() {
        let start: ClientMessage = serde_json::from_str(r#"{"event":"start_story"}"#).unwrap();
        assert_eq!(start, ClientMessage::StartStory { genre: DEFAULT_GENRE.into() });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"dance"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let choices: ChoiceMap = [('A', "Run".to_string())].into_iter().collect();
        let started = ServerMessage::StoryStarted {
            story: "Dark.".into(),
            choices: Some(choices),
        };
        assert_eq!(
            serde_json::to_value(&started).unwrap(),
            json!({"event": "story_started", "story": "Dark.", "choices": {"A": "Run"}})
        );

        let ended = ServerMessage::StoryContinued {
            story: "The end.".into(),
            choices: None,
        };
        assert_eq!(serde_json::to_value(&ended).unwrap()["choices"], json!(null));

        assert_eq!(
            serde_json::to_value(ServerMessage::error("offline")).unwrap(),
            json!({"event": "error", "message": "offline"})
        );
    }
}
