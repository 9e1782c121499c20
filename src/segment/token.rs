//! Token types for segmentation.
//!
//! A [`Token`] is the unit that flows out of the segmenter: a slice of the
//! original input with **character** offsets (not bytes), a script
//! classification, and compound metadata when the slice matched a
//! dictionary entry.
//!
//! Offsets are monotonically non-decreasing and non-overlapping, and every
//! input character is covered by exactly one token or one skipped
//! whitespace run, so the original string can always be reconstructed from
//! a token sequence plus the input.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dictionary::DictionaryEntry;

/// A single unit of segmented text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token.
    pub text: String,

    /// Character offset where this token starts in the original text.
    pub start: usize,

    /// Character offset one past the end of this token.
    pub end: usize,

    /// Script classification of the token content.
    pub token_type: TokenType,

    /// Whether this token matched a dictionary term.
    pub is_compound: bool,

    /// Segmentation confidence in `[0, 1]`.
    pub confidence: f32,

    /// Category of the matched dictionary entry, if any.
    pub category: Option<String>,

    /// Component breakdown of the matched dictionary entry, if any.
    pub components: Option<Vec<String>>,
}

/// Script classification for token content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Thai script.
    Thai,
    /// Latin or other non-Thai alphabetic runs, passed through untouched.
    Latin,
    /// Numeric runs (ASCII or Thai digits).
    Numeric,
    /// Punctuation and symbol runs.
    Punctuation,
    /// Anything else.
    Other,
}

impl Token {
    /// Create a token covering `[start, end)` in character offsets.
    pub fn with_span<S: Into<String>>(text: S, start: usize, end: usize) -> Self {
        Token {
            text: text.into(),
            start,
            end,
            token_type: TokenType::Other,
            is_compound: false,
            confidence: 1.0,
            category: None,
            components: None,
        }
    }

    /// Set the token type.
    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Mark this token as a dictionary match, taking confidence, category,
    /// and components from the entry.
    pub fn with_entry(mut self, entry: &DictionaryEntry) -> Self {
        self.is_compound = true;
        self.confidence = entry.confidence;
        if !entry.category.is_empty() {
            self.category = Some(entry.category.clone());
        }
        if !entry.components.is_empty() {
            self.components = Some(entry.components.clone());
        }
        self
    }

    /// Shift both offsets by `base` characters (used when an engine
    /// segmented a substring of the request text).
    pub fn shifted(mut self, base: usize) -> Self {
        self.start += base;
        self.end += base;
        self
    }

    /// Number of characters this token spans.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Whether this token is a word-like unit (not punctuation).
    pub fn is_word(&self) -> bool {
        !matches!(self.token_type, TokenType::Punctuation)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Classify one character into a script class.
pub fn script_of(c: char) -> Script {
    if c.is_whitespace() {
        Script::Whitespace
    } else if c.is_numeric() {
        Script::Digit
    } else if is_thai(c) {
        Script::Thai
    } else if c.is_alphabetic() {
        Script::Latin
    } else {
        Script::Other
    }
}

/// Character-level script class used by the run scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Script {
    /// Thai block characters (excluding Thai digits).
    Thai,
    /// Any other alphabetic script.
    Latin,
    /// Digits, including Thai digits.
    Digit,
    /// Whitespace.
    Whitespace,
    /// Punctuation and symbols.
    Other,
}

impl Script {
    /// The token type emitted for a pass-through run of this script.
    pub fn token_type(self) -> TokenType {
        match self {
            Script::Thai => TokenType::Thai,
            Script::Latin => TokenType::Latin,
            Script::Digit => TokenType::Numeric,
            Script::Other => TokenType::Punctuation,
            Script::Whitespace => TokenType::Other,
        }
    }
}

/// Whether a character belongs to the Thai Unicode block.
pub fn is_thai(c: char) -> bool {
    matches!(c, '\u{0E00}'..='\u{0E7F}')
}
