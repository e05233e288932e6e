//! Choice extraction from generated story text.
//!
//! The model is asked to end each turn with a block like
//! `{'A': '...', 'B': '...', 'E': 'Stop'}`, but it rarely sticks to strict
//! JSON. Extraction tries the last balanced brace block as a relaxed object
//! literal first, then falls back to scanning for `A: '...'` pairs anywhere in
//! the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Letter conventionally used for "stop the story".
pub const STOP_LETTER: char = 'E';

/// Letters a choice may be labeled with.
pub const CHOICE_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// `A: '...'`, `'B': "..."`, `"C": '...'` anywhere in the text. Values stop
/// at their closing quote, so several pairs may share a line.
static CHOICE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b([A-E])\b['"]?\s*:\s*(?:'([^'\n]*)'|"([^"\n]*)")"#)
        .expect("invalid choice line regex")
});

/// Choices offered at the end of a story turn, keyed by uppercase letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceMap(BTreeMap<char, String>);

impl ChoiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a choice, replacing any previous description for the letter.
    ///
    /// Returns `false` (and leaves the map untouched) if `letter` is not A-E.
    pub fn insert(&mut self, letter: char, description: impl Into<String>) -> bool {
        let letter = letter.to_ascii_uppercase();
        if !CHOICE_LETTERS.contains(&letter) {
            return false;
        }
        self.0.insert(letter, description.into());
        true
    }

    pub fn get(&self, letter: char) -> Option<&str> {
        self.0.get(&letter.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.0.contains_key(&letter.to_ascii_uppercase())
    }

    /// Letters in alphabetical order.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.0.iter().map(|(letter, text)| (*letter, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The stop letter, if this map offers it.
    pub fn stop_letter(&self) -> Option<char> {
        self.contains(STOP_LETTER).then_some(STOP_LETTER)
    }

    pub fn is_stop(letter: char) -> bool {
        letter.to_ascii_uppercase() == STOP_LETTER
    }
}

impl FromIterator<(char, String)> for ChoiceMap {
    fn from_iter<I: IntoIterator<Item = (char, String)>>(iter: I) -> Self {
        let mut map = ChoiceMap::new();
        for (letter, text) in iter {
            map.insert(letter, text);
        }
        map
    }
}

/// Extract the choice menu from a generated turn.
///
/// Returns `None` when the text offers no recognisable choices, which is an
/// ordinary outcome (the model may simply end the story).
pub fn extract_choices(text: &str) -> Option<ChoiceMap> {
    if let Some(block) = last_brace_block(text) {
        if let Some(choices) = parse_choice_block(block) {
            return Some(choices);
        }
        tracing::debug!("choice block did not parse, falling back to line scan");
    }

    let choices = scan_choice_lines(text);
    (!choices.is_empty()).then_some(choices)
}

/// Find the last top-level balanced `{...}` block.
///
/// A single pass over the text: unterminated opens simply never produce a
/// block, and stray closing braces are ignored.
pub(crate) fn last_brace_block(text: &str) -> Option<&str> {
    brace_spans(text).last().map(|&(start, end)| &text[start..end])
}

/// Byte ranges of every top-level balanced `{...}` block, in order.
pub(crate) fn brace_spans(text: &str) -> Vec<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut spans = Vec::new();

    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

/// Parse a brace block into choices, keeping only letter keys.
pub(crate) fn parse_choice_block(block: &str) -> Option<ChoiceMap> {
    // Keys keep their order so a later `A` overrides an earlier `a`.
    let strict = serde_json::from_str::<serde_json::Map<String, Value>>(block)
        .ok()
        .and_then(|map| {
            map.into_iter()
                .map(|(key, value)| match value {
                    Value::String(text) => Some((key, text)),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
        });
    let entries = match strict {
        Some(entries) => entries,
        None => RelaxedObject::new(block).parse()?,
    };

    let choices: ChoiceMap = entries
        .into_iter()
        .filter_map(|(key, value)| {
            let letter = choice_letter(&key)?;
            let value = value.trim();
            (!value.is_empty()).then(|| (letter, value.to_string()))
        })
        .collect();

    (!choices.is_empty()).then_some(choices)
}

fn scan_choice_lines(text: &str) -> ChoiceMap {
    CHOICE_LINE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let letter = caps.get(1)?.as_str().chars().next()?;
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().trim();
            (!value.is_empty()).then(|| (letter, value.to_string()))
        })
        .collect()
}

fn choice_letter(key: &str) -> Option<char> {
    let mut chars = key.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    (chars.next().is_none() && CHOICE_LETTERS.contains(&letter)).then_some(letter)
}

/// Parser for object literals with single- or double-quoted strings, bare
/// keys and trailing commas.
///
/// A quote only closes a string when it is followed by `,`, `:` or `}`, so
/// apostrophes inside single-quoted descriptions survive.
struct RelaxedObject {
    chars: Vec<char>,
    pos: usize,
}

impl RelaxedObject {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Option<Vec<(String, String)>> {
        let mut entries = Vec::new();

        self.expect('{')?;
        loop {
            self.skip_whitespace();
            match self.peek()? {
                '}' => {
                    self.pos += 1;
                    break;
                }
                ',' => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let key = self.key()?;
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.quoted()?;
            entries.push((key, value));

            self.skip_whitespace();
            match self.peek()? {
                ',' => self.pos += 1,
                '}' => {}
                _ => return None,
            }
        }

        self.skip_whitespace();
        (self.pos == self.chars.len()).then_some(entries)
    }

    fn key(&mut self) -> Option<String> {
        match self.peek()? {
            '\'' | '"' => self.quoted(),
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    self.pos += 1;
                }
                (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn quoted(&mut self) -> Option<String> {
        let quote = self.peek().filter(|c| *c == '\'' || *c == '"')?;
        self.pos += 1;

        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\\' {
                let escaped = self.peek()?;
                self.pos += 1;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            } else if c == quote && self.closes_string() {
                return Some(out);
            } else {
                out.push(c);
            }
        }

        None
    }

    fn closes_string(&self) -> bool {
        self.chars[self.pos..]
            .iter()
            .find(|c| !c.is_whitespace())
            .map_or(true, |c| matches!(c, ',' | ':' | '}'))
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        (self.peek()? == expected).then(|| self.pos += 1)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(char, &str)]) -> ChoiceMap {
        pairs.iter().map(|(l, d)| (*l, d.to_string())).collect()
    }

    #[test]
    fn test_single_quoted_block_in_prose() {
        let text = "The door creaks open.\n\n\n{\n    'A': 'Step inside',\n    'B': 'Run away',\n    'E': 'Stop'\n}\nGood luck!";
        let choices = extract_choices(text).unwrap();
        assert_eq!(
            choices,
            map(&[('A', "Step inside"), ('B', "Run away"), ('E', "Stop")])
        );
    }

    #[test]
    fn test_double_quoted_block() {
        let text = r#"Prose first. {"A": "Climb", "B": "Swim", "C": "Wait", "D": "Shout", "E": "Stop"}"#;
        let choices = extract_choices(text).unwrap();
        assert_eq!(choices.len(), 5);
        assert_eq!(choices.get('d'), Some("Shout"));
        assert_eq!(choices.stop_letter(), Some('E'));
    }

    #[test]
    fn test_various_maps_roundtrip() {
        let cases: [&[(char, &str)]; 3] = [
            &[('A', "Open the chest"), ('E', "Stop")],
            &[('A', "Left"), ('B', "Right"), ('C', "Back")],
            &[('B', "Bargain"), ('C', "Fight"), ('D', "Flee"), ('E', "Stop")],
        ];

        for pairs in cases {
            let expected = map(pairs);
            for quote in ['\'', '"'] {
                let body: Vec<String> = pairs
                    .iter()
                    .map(|(l, d)| format!("{quote}{l}{quote}: {quote}{d}{quote}"))
                    .collect();
                let text = format!("Once upon a time.\n\n{{{}}}\nThe end?", body.join(",\n"));
                assert_eq!(extract_choices(&text), Some(expected.clone()), "{text}");
            }
        }
    }

    #[test]
    fn test_apostrophes_inside_descriptions() {
        let text = "{'A': 'Enter the wizard's tower', 'B': 'Don't move', 'E': 'Stop'}";
        let choices = extract_choices(text).unwrap();
        assert_eq!(choices.get('A'), Some("Enter the wizard's tower"));
        assert_eq!(choices.get('B'), Some("Don't move"));
    }

    #[test]
    fn test_last_block_wins() {
        let text = "{'A': 'old'} more story {'A': 'new', 'B': 'newer'}";
        let choices = extract_choices(text).unwrap();
        assert_eq!(choices, map(&[('A', "new"), ('B', "newer")]));
    }

    #[test]
    fn test_nested_block_is_balanced() {
        assert_eq!(
            last_brace_block("x {a {b} c} y"),
            Some("{a {b} c}")
        );
        assert_eq!(last_brace_block("} stray {open"), None);
    }

    #[test]
    fn test_no_structure() {
        assert_eq!(extract_choices("no structure here"), None);
        assert_eq!(extract_choices(""), None);
    }

    #[test]
    fn test_unbalanced_braces_fall_back() {
        let choices = extract_choices("{'A': 'x'").unwrap();
        assert_eq!(choices, map(&[('A', "x")]));

        assert_eq!(extract_choices("{{{{{{"), None);
        assert_eq!(extract_choices("}}}}{"), None);
    }

    #[test]
    fn test_fallback_line_scan() {
        let text = "What now?\nA: 'Follow the river'\nB: \"Climb the hill\"\nE: 'Stop'";
        let choices = extract_choices(text).unwrap();
        assert_eq!(
            choices,
            map(&[('A', "Follow the river"), ('B', "Climb the hill"), ('E', "Stop")])
        );
    }

    #[test]
    fn test_fallback_last_duplicate_wins() {
        let text = "'A': 'first'\nthen\n'A': 'second'";
        assert_eq!(extract_choices(text).unwrap().get('A'), Some("second"));
    }

    #[test]
    fn test_line_scan_in_running_prose() {
        let choices = extract_choices("What next? A: 'Fight the troll'. B: 'Flee'.").unwrap();
        assert_eq!(choices, map(&[('A', "Fight the troll"), ('B', "Flee")]));

        let choices = extract_choices("Choose A: 'Fight' or B: 'Flee'").unwrap();
        assert_eq!(choices, map(&[('A', "Fight"), ('B', "Flee")]));
    }

    #[test]
    fn test_line_scan_ignores_trailing_text() {
        let text = "'A': 'Open the door' (recommended)\n'B': 'Wait'";
        let choices = extract_choices(text).unwrap();
        assert_eq!(choices, map(&[('A', "Open the door"), ('B', "Wait")]));
    }

    #[test]
    fn test_unterminated_block_keeps_every_pair() {
        let choices = extract_choices("{A: 'x',B: 'y'").unwrap();
        assert_eq!(choices, map(&[('A', "x"), ('B', "y")]));
    }

    #[test]
    fn test_line_scan_needs_a_lone_letter() {
        assert_eq!(extract_choices("Plan AB: 'nope' and lower a: 'no'"), None);
    }

    #[test]
    fn test_strict_json_later_key_wins() {
        let choices = extract_choices(r#"{"a": "first", "A": "second", "B": "other"}"#).unwrap();
        assert_eq!(choices, map(&[('A', "second"), ('B', "other")]));
    }

    #[test]
    fn test_brace_spans() {
        assert_eq!(brace_spans("{a} x {b {c}} {open"), vec![(0, 3), (6, 13)]);
    }

    #[test]
    fn test_block_without_letters_falls_back() {
        let text = "{\"mood\": \"grim\"}\n'A': 'Press on'";
        let choices = extract_choices(text).unwrap();
        assert_eq!(choices, map(&[('A', "Press on")]));
    }

    #[test]
    fn test_relaxed_object_forms() {
        let parsed = RelaxedObject::new("{ A: 'bare key', \"b\": \"lower\", }")
            .parse()
            .unwrap();
        assert_eq!(
            parsed,
            vec![
                ("A".to_string(), "bare key".to_string()),
                ("b".to_string(), "lower".to_string())
            ]
        );
        assert!(RelaxedObject::new("{'A' 'x'}").parse().is_none());
        assert!(RelaxedObject::new("{'A': {'nested': 'x'}}").parse().is_none());
    }

    #[test]
    fn test_lowercase_keys_normalised() {
        let choices = extract_choices("{'a': 'one', 'e': 'stop'}").unwrap();
        assert!(choices.contains('A'));
        assert_eq!(choices.letters().collect::<Vec<_>>(), vec!['A', 'E']);
    }

    #[test]
    fn test_choice_map_helpers() {
        let mut choices = ChoiceMap::new();
        assert!(choices.insert('b', "Bridge"));
        assert!(!choices.insert('Z', "nope"));
        assert_eq!(choices.len(), 1);
        assert_eq!(choices.stop_letter(), None);
        assert!(ChoiceMap::is_stop('e'));
        assert!(!ChoiceMap::is_stop('A'));
    }

    #[test]
    fn test_choice_map_json() {
        let choices = map(&[('A', "Go"), ('E', "Stop")]);
        let json = serde_json::to_string(&choices).unwrap();
        assert_eq!(json, r#"{"A":"Go","E":"Stop"}"#);
        let back: ChoiceMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, choices);
    }
}
