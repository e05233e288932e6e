//! Narrative history and the plain-text story rendering.

use crate::choices::{brace_spans, parse_choice_block};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Lines that are themselves a choice label: `(A): ...` or a letter with a
/// quoted value such as `'C': '...'`. Dialogue like
/// `B: Bob replied.` is left alone.
static CHOICE_LABEL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*[-*]?[ \t]*(?:\([ \t]*[A-E][ \t]*\)[ \t]*[:)]|['"]?[A-E]['"]?[ \t]*:[ \t]*['"]).*$"#,
    )
    .expect("invalid choice label regex")
});

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("invalid blank line regex"));

const TITLE_RULE_WIDTH: usize = 40;

/// The full text of one generation turn: prose plus its trailing choice block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeSegment(String);

impl NarrativeSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The segment's prose with the choice block removed.
    pub fn prose(&self) -> String {
        strip_choice_block(&self.0)
    }
}

impl From<String> for NarrativeSegment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for NarrativeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered narrative of a story, one segment per completed turn.
///
/// Segments can only be appended; a turn that failed never gets here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryHistory {
    segments: Vec<NarrativeSegment>,
}

impl StoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment and return it.
    pub fn push(&mut self, segment: NarrativeSegment) -> &NarrativeSegment {
        self.segments.push(segment);
        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &[NarrativeSegment] {
        &self.segments
    }

    pub fn latest(&self) -> Option<&NarrativeSegment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The story so far as fed back to the model: segments joined by newlines.
    pub fn joined(&self) -> String {
        self.segments
            .iter()
            .map(NarrativeSegment::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Remove the choice menu from a turn's text.
///
/// Drops every brace block that parses as choices, then any line that is a
/// choice label on its own, and squeezes the blank lines left behind.
pub fn strip_choice_block(text: &str) -> String {
    let mut cleaned = text.to_string();

    for (start, end) in brace_spans(text).into_iter().rev() {
        if parse_choice_block(&text[start..end]).is_some() {
            cleaned.replace_range(start..end, "");
        }
    }

    let cleaned = CHOICE_LABEL_LINE_RE.replace_all(&cleaned, "");
    BLANK_RUN_RE
        .replace_all(cleaned.trim(), "\n\n")
        .into_owned()
}

/// Render a story as the plain-text file format.
///
/// ```text
/// Interactive Fantasy Story
/// ========================================
///
/// First segment...
///
/// Second segment...
/// ```
pub fn render_story(genre: &str, history: &StoryHistory) -> String {
    let body = history
        .segments()
        .iter()
        .map(NarrativeSegment::prose)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Interactive {} Story\n{}\n\n{body}",
        capitalize(genre),
        "=".repeat(TITLE_RULE_WIDTH)
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURN: &str = "The gate groans open.\n\nA figure waits beyond it.\n\n\n{\n    'A': 'Approach the figure',\n    'B': 'Hide',\n    'E': 'Stop'\n}";

    #[test]
    fn test_history_is_ordered() {
        let mut history = StoryHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);

        history.push(NarrativeSegment::new("one"));
        history.push(NarrativeSegment::new("two"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().map(NarrativeSegment::as_str), Some("two"));
        assert_eq!(history.joined(), "one\ntwo");
    }

    #[test]
    fn test_strip_choice_block() {
        assert_eq!(
            strip_choice_block(TURN),
            "The gate groans open.\n\nA figure waits beyond it."
        );
    }

    #[test]
    fn test_strip_labelled_lines() {
        let text = "Night falls.\n(A): Light a fire\n(B): Keep walking\nA: 'Sleep'\nA lone wolf howls.";
        assert_eq!(strip_choice_block(text), "Night falls.\n\nA lone wolf howls.");
    }

    #[test]
    fn test_strip_keeps_dialogue_lines() {
        let text = "A: I'm not going.\nB: Bob replied.";
        assert_eq!(strip_choice_block(text), text);
    }

    #[test]
    fn test_strip_block_followed_by_other_braces() {
        let text = "The road forks. {'A': 'Go', 'B': 'Stay'} The narrator adds {note}";
        assert_eq!(
            strip_choice_block(text),
            "The road forks.  The narrator adds {note}"
        );
    }

    #[test]
    fn test_strip_keeps_non_choice_braces() {
        let text = "She wrote {unknown} on the wall.";
        assert_eq!(strip_choice_block(text), text);
    }

    #[test]
    fn test_render_story() {
        let mut history = StoryHistory::new();
        history.push(NarrativeSegment::new(TURN));
        history.push(NarrativeSegment::new("You hide.\n\n{'A': 'Wait', 'E': 'Stop'}"));

        let rendered = render_story("fantasy", &history);
        let mut lines = rendered.lines();

        assert_eq!(lines.next(), Some("Interactive Fantasy Story"));
        assert_eq!(lines.next(), Some("=".repeat(40).as_str()));
        assert_eq!(lines.next(), Some(""));
        assert!(rendered.ends_with("A figure waits beyond it.\n\nYou hide."));
        assert!(!rendered.contains("'A'"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("sCI-FI"), "Sci-fi");
        assert_eq!(capitalize(""), "");
    }
}
