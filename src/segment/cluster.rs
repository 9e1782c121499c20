//! Thai character-cluster segmentation.
//!
//! A cluster is the smallest orthographic unit that may not be split:
//! a base character plus its combining vowels and tone marks, with leading
//! vowels bound to the consonant they precede. Cluster boundaries are a
//! crude but safe word approximation: they never cut through a combining
//! mark, so downstream engines and highlighters always see well-formed
//! Thai.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::segment::SegmentEngine;
use crate::segment::runs::{passthrough_token, scan_runs};
use crate::segment::token::{Script, Token, TokenType};

/// Confidence assigned to cluster tokens; clusters are units, not words.
const CLUSTER_CONFIDENCE: f32 = 0.3;

/// Leading vowels bind to the following consonant.
fn is_leading_vowel(c: char) -> bool {
    matches!(c, '\u{0E40}'..='\u{0E44}')
}

/// Marks and dependent vowels that bind to the preceding cluster.
fn binds_backward(c: char) -> bool {
    matches!(
        c,
        '\u{0E30}'        // sara a
        | '\u{0E31}'      // mai han-akat
        | '\u{0E32}'      // sara aa
        | '\u{0E33}'      // sara am
        | '\u{0E34}'..='\u{0E3A}' // sara i .. phinthu
        | '\u{0E45}'      // lakkhangyao
        | '\u{0E46}'      // mai yamok
        | '\u{0E47}'..='\u{0E4E}' // mai taikhu, tones, thanthakhat, nikhahit, yamakkan
    )
}

/// Split a Thai character slice into cluster ranges (relative indices).
pub fn split_clusters(chars: &[char]) -> Vec<(usize, usize)> {
    let mut clusters = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let mut j = i + 1;
        // A leading vowel takes the consonant it precedes into the cluster.
        if is_leading_vowel(chars[i]) && j < chars.len() {
            j += 1;
        }
        while j < chars.len() && binds_backward(chars[j]) {
            j += 1;
        }
        clusters.push((i, j));
        i = j;
    }

    clusters
}

/// Segmentation engine emitting one token per Thai character cluster.
#[derive(Clone, Debug, Default)]
pub struct ClusterEngine;

impl ClusterEngine {
    /// Create a new cluster engine.
    pub fn new() -> Self {
        ClusterEngine
    }
}

impl SegmentEngine for ClusterEngine {
    fn segment(&self, text: &str, budget: Duration) -> Result<Option<Vec<Token>>> {
        let started = Instant::now();
        let mut tokens = Vec::new();

        for run in scan_runs(text) {
            if started.elapsed() > budget {
                return Ok(None);
            }
            if run.script != Script::Thai {
                tokens.extend(passthrough_token(text, &run));
                continue;
            }

            let slice = &text[run.byte_start..run.byte_end];
            let chars: Vec<char> = slice.chars().collect();
            for (rel_start, rel_end) in split_clusters(&chars) {
                let cluster: String = chars[rel_start..rel_end].iter().collect();
                tokens.push(
                    Token::with_span(
                        cluster,
                        run.char_start + rel_start,
                        run.char_start + rel_end,
                    )
                    .with_token_type(TokenType::Thai)
                    .with_confidence(CLUSTER_CONFIDENCE),
                );
            }
        }

        Ok(Some(tokens))
    }

    fn name(&self) -> &'static str {
        "cluster"
    }
}
