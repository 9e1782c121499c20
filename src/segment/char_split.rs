//! Grapheme-cluster split: the guaranteed-terminating last resort.
//!
//! Splits on extended grapheme cluster boundaries (UAX #29), which keeps
//! combining marks attached to their base characters. This engine never
//! declines; the chain relies on that, so it ignores the time budget.

use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::segment::SegmentEngine;
use crate::segment::token::{Token, script_of};

/// Confidence for single-grapheme tokens.
const GRAPHEME_CONFIDENCE: f32 = 0.1;

/// Segmentation engine emitting one token per grapheme cluster.
#[derive(Clone, Debug, Default)]
pub struct CharSplitEngine;

impl CharSplitEngine {
    /// Create a new character-split engine.
    pub fn new() -> Self {
        CharSplitEngine
    }
}

impl SegmentEngine for CharSplitEngine {
    fn segment(&self, text: &str, _budget: Duration) -> Result<Option<Vec<Token>>> {
        let mut tokens = Vec::new();
        let mut char_pos = 0;

        for grapheme in text.graphemes(true) {
            let char_len = grapheme.chars().count();
            let first = grapheme.chars().next().unwrap_or(' ');
            if first.is_whitespace() {
                char_pos += char_len;
                continue;
            }

            tokens.push(
                Token::with_span(grapheme, char_pos, char_pos + char_len)
                    .with_token_type(script_of(first).token_type())
                    .with_confidence(GRAPHEME_CONFIDENCE),
            );
            char_pos += char_len;
        }

        Ok(Some(tokens))
    }

    fn name(&self) -> &'static str {
        "char_split"
    }
}
