//! Prompts for the storyteller model.
//!
//! Every builder is a pure function: the genre and chosen letter are
//! interpolated verbatim and it is left to the model to make sense of them.

/// The choice block shape the model is asked to end every turn with.
const CHOICE_BLOCK_SHAPE: &str = r#"{
    'A': 'Choice A description here',
    'B': 'Choice B description here',
    'C': 'Choice C description here',
    'D': 'Choice D description here',
    'E': 'Stop'
}"#;

/// Build the prompt that opens a new story in the given genre.
pub fn start_prompt(genre: &str) -> String {
    format!(
        r#"You are an expert storyteller creating an interactive narrative in the {genre} genre.

## Your Task
1. Begin a captivating story with multiple potential paths that sticks to the {genre} genre
2. Offer several distinct narrative choices that relate to {genre}
3. Make each choice a meaningful decision point
4. Create an immersive, engaging narrative
5. Include a 'STOP' option

## Rules
- The story must be creative and unpredictable
- Choices should dramatically alter the narrative
- Keep a consistent and exciting tone

Write the opening of the story, setting the scene and introducing the main character.
After the narrative, provide choices labeled A, B, C and D, with E reserved for 'STOP'.

Put the choices at the very end in the following format, separated from the story by 2 empty lines:


{CHOICE_BLOCK_SHAPE}
"#
    )
}

/// Build the prompt that continues a story after the reader picked a choice.
///
/// `prior_narrative` is the whole story so far, embedded as-is.
pub fn continuation_prompt(genre: &str, prior_narrative: &str, chosen_letter: &str) -> String {
    format!(
        r#"You are continuing an interactive {genre} story.

## Story So Far
{prior_narrative}

## Reader's Choice
The reader chose the action labeled: {chosen_letter}

## Your Task
1. Directly incorporate the consequences of the chosen action
2. Build narrative tension
3. Offer several distinct narrative choices
4. Make sure each choice has a significant impact
5. Include a 'STOP' option

Write the continuation of the story, then provide new choices labeled A, B, C and D, with E reserved for 'STOP'.

Put the choices at the very end in the following format:

{CHOICE_BLOCK_SHAPE}
"#
    )
}

/// Prompt asking the model for genre suggestions.
pub fn genre_help_prompt() -> &'static str {
    "List up to 10 engaging story genres. For each one give a brief 1-2 word \
description. Format the output as a clear, readable list that sparks the \
imagination. Output nothing but the list: no preamble and no closing remarks."
}
