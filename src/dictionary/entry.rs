//! Dictionary entry type.

use serde::{Deserialize, Serialize};

/// A single known compound term with its metadata.
///
/// Entries are owned exclusively by the dictionary store and never mutated
/// after load; administration happens outside the proxy and arrives as a
/// whole new snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// The compound term, exactly as it appears in text.
    pub term: String,

    /// Free-form category from the administration source
    /// (e.g. `"compound"`, `"brand"`, `"loanword"`).
    #[serde(default)]
    pub category: String,

    /// Segmentation confidence in `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    /// Known component breakdown of the term, if any.
    #[serde(default)]
    pub components: Vec<String>,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_confidence() -> f32 {
    1.0
}

impl DictionaryEntry {
    /// Create a new entry with the given term and category.
    pub fn new<S: Into<String>>(term: S, category: S) -> Self {
        DictionaryEntry {
            term: term.into(),
            category: category.into(),
            confidence: 1.0,
            components: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the component breakdown.
    pub fn with_components(mut self, components: Vec<String>) -> Self {
        self.components = components;
        self
    }

    /// Number of characters in the term.
    pub fn char_len(&self) -> usize {
        self.term.chars().count()
    }
}
