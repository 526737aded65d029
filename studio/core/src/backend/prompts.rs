//! Prompt construction
//!
//! Prompts are pure functions of their inputs so the same card always asks
//! the model the same question.

use crate::card::Tone;

/// Upper bound on wish length the model is asked to respect
pub const MAX_WISH_WORDS: usize = 50;

/// Prompt for a wish from `sender` to `recipient` in `tone`
#[must_use]
pub fn wish_prompt(recipient: &str, sender: &str, tone: Tone) -> String {
    format!(
        "Write a {tone} Christmas and New Year wish for {recipient}, from {sender}. \
         Keep it under {MAX_WISH_WORDS} words. \
         Respond with the wish only, as plain text: no markdown, no quotes, no hashtags.",
        tone = tone.label().to_lowercase(),
    )
}

/// Prompt for an illustration matching `tone`
#[must_use]
pub fn image_prompt(tone: Tone) -> String {
    match tone {
        Tone::Funny => "A whimsical, cartoon-style Christmas illustration: a cheerful snowman, \
                        playful reindeer and a pile of brightly wrapped presents in a cozy snowy \
                        village. Vibrant colors, soft shading, no text."
            .to_string(),
        _ => "An elegant, painterly Christmas illustration: a softly glowing winter landscape \
              with a decorated fir tree, warm candlelight and gentle falling snow. Rich festive \
              colors, fine brushwork, no text."
            .to_string(),
    }
}
