//! The segmenter chain: dictionary maximal matching with ordered fallbacks.
//!
//! The primary pass scans left to right and takes the longest dictionary
//! term at every position. Stretches no dictionary term covers are handed
//! to the fallback engines in order; each either segments the stretch or
//! declines, and the final character-split engine never declines. An engine
//! that exceeds its time budget counts as declined, so segmentation as a
//! whole never blocks indefinitely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::dictionary::{DictionarySnapshot, DictionaryStore};
use crate::error::{Result, TatkhamError};
use crate::segment::char_split::CharSplitEngine;
use crate::segment::cluster::ClusterEngine;
use crate::segment::lexicon::LexiconEngine;
use crate::segment::runs::{passthrough_token, scan_runs};
use crate::segment::token::{Script, Token, TokenType};
use crate::segment::SegmentEngine;

/// Name reported for the primary dictionary pass.
pub const DICTIONARY_ENGINE: &str = "dictionary";

/// The result of segmenting one input.
#[derive(Clone, Debug, Serialize)]
pub struct Segmentation {
    /// Tokens in input order.
    pub tokens: Vec<Token>,

    /// Engines that contributed tokens, in first-use order.
    pub engines_used: Vec<&'static str>,

    /// Wall-clock time spent segmenting.
    pub elapsed: Duration,
}

impl Segmentation {
    /// Whether any token came from the compound dictionary.
    pub fn has_compound(&self) -> bool {
        self.tokens.iter().any(|t| t.is_compound)
    }

    /// Texts of all word-like tokens, in order.
    pub fn word_texts(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| t.is_word())
            .map(|t| t.text.as_str())
            .collect()
    }
}

/// Dictionary-driven segmenter with an ordered fallback chain.
pub struct SegmenterChain {
    store: Arc<DictionaryStore>,
    fallbacks: Vec<Arc<dyn SegmentEngine>>,
    engine_budget: Duration,
}

impl SegmenterChain {
    /// Create a chain with the default fallbacks:
    /// lexicon → cluster → char_split.
    pub fn new(store: Arc<DictionaryStore>, engine_budget: Duration) -> Self {
        SegmenterChain {
            store,
            fallbacks: vec![
                Arc::new(LexiconEngine::new()),
                Arc::new(ClusterEngine::new()),
                Arc::new(CharSplitEngine::new()),
            ],
            engine_budget,
        }
    }

    /// Create a chain with custom fallback engines. The last engine must be
    /// one that never declines; a chain without such an anchor can fail
    /// with [`TatkhamError::EnginesExhausted`] at request time.
    pub fn with_fallbacks(
        store: Arc<DictionaryStore>,
        engine_budget: Duration,
        fallbacks: Vec<Arc<dyn SegmentEngine>>,
    ) -> Self {
        SegmenterChain {
            store,
            fallbacks,
            engine_budget,
        }
    }

    /// Names of all engines in chain order, primary first.
    pub fn engine_names(&self) -> Vec<&'static str> {
        let mut names = vec![DICTIONARY_ENGINE];
        names.extend(self.fallbacks.iter().map(|e| e.name()));
        names
    }

    /// Segment text with the full chain.
    pub fn segment(&self, text: &str) -> Result<Segmentation> {
        let started = Instant::now();
        let snapshot = self.store.snapshot();
        let mut used = UsedEngines::default();

        let tokens = match self.primary_pass(text, &snapshot, started, &mut used)? {
            Some(tokens) => tokens,
            // Primary exceeded its budget; treat it as declined and hand
            // the whole text to the fallbacks.
            None => self.resolve_fallback(text, 0, &mut used)?,
        };

        Ok(Segmentation {
            tokens,
            engines_used: used.names,
            elapsed: started.elapsed(),
        })
    }

    /// Segment with one named engine only (tokenize endpoint override).
    /// The name `dictionary` runs the full chain, since the primary pass
    /// needs the fallbacks for unknown stretches.
    pub fn segment_with(&self, engine: &str, text: &str) -> Result<Segmentation> {
        if engine == DICTIONARY_ENGINE {
            return self.segment(text);
        }

        let found = self
            .fallbacks
            .iter()
            .find(|e| e.name() == engine)
            .ok_or_else(|| {
                TatkhamError::invalid_argument(format!("unknown segmentation engine '{engine}'"))
            })?;

        let started = Instant::now();
        match found.segment(text, self.engine_budget)? {
            Some(tokens) => Ok(Segmentation {
                tokens,
                engines_used: vec![found.name()],
                elapsed: started.elapsed(),
            }),
            None => Err(TatkhamError::engines_exhausted(format!(
                "engine '{engine}' declined the input"
            ))),
        }
    }

    /// The dictionary maximal-matching pass. Returns `None` when the pass
    /// itself ran out of budget.
    fn primary_pass(
        &self,
        text: &str,
        snapshot: &DictionarySnapshot,
        started: Instant,
        used: &mut UsedEngines,
    ) -> Result<Option<Vec<Token>>> {
        let mut tokens = Vec::new();

        for run in scan_runs(text) {
            if started.elapsed() > self.engine_budget {
                return Ok(None);
            }
            if run.script != Script::Thai {
                tokens.extend(passthrough_token(text, &run));
                continue;
            }

            let chars: Vec<char> = text[run.byte_start..run.byte_end].chars().collect();
            let byte_pos = byte_positions(&chars);
            let mut i = 0;
            let mut unknown_from: Option<usize> = None;

            while i < chars.len() {
                if started.elapsed() > self.engine_budget {
                    return Ok(None);
                }
                match snapshot.longest_match(&chars, i) {
                    Some((len, entry)) => {
                        if let Some(from) = unknown_from.take() {
                            let stretch =
                                &text[run.byte_start + byte_pos[from]..run.byte_start + byte_pos[i]];
                            tokens.extend(self.resolve_fallback(
                                stretch,
                                run.char_start + from,
                                used,
                            )?);
                        }
                        used.mark(DICTIONARY_ENGINE);
                        let term: String = chars[i..i + len].iter().collect();
                        tokens.push(
                            Token::with_span(term, run.char_start + i, run.char_start + i + len)
                                .with_token_type(TokenType::Thai)
                                .with_entry(entry),
                        );
                        i += len;
                    }
                    None => {
                        unknown_from.get_or_insert(i);
                        i += 1;
                    }
                }
            }
            if let Some(from) = unknown_from {
                let stretch = &text[run.byte_start + byte_pos[from]..run.byte_end];
                tokens.extend(self.resolve_fallback(stretch, run.char_start + from, used)?);
            }
        }

        Ok(Some(tokens))
    }

    /// Try the fallback engines in order on one stretch of text.
    fn resolve_fallback(
        &self,
        text: &str,
        char_base: usize,
        used: &mut UsedEngines,
    ) -> Result<Vec<Token>> {
        for engine in &self.fallbacks {
            if let Some(tokens) = engine.segment(text, self.engine_budget)? {
                used.mark(engine.name());
                return Ok(tokens.into_iter().map(|t| t.shifted(char_base)).collect());
            }
        }
        Err(TatkhamError::engines_exhausted(
            "no fallback engine accepted the input; the chain is missing its char_split anchor",
        ))
    }
}

/// Byte offset of every char index in `chars`, plus one past the end.
fn byte_positions(chars: &[char]) -> Vec<usize> {
    let mut positions = Vec::with_capacity(chars.len() + 1);
    let mut pos = 0;
    for c in chars {
        positions.push(pos);
        pos += c.len_utf8();
    }
    positions.push(pos);
    positions
}

/// Engines that contributed tokens, deduplicated in first-use order.
#[derive(Default)]
struct UsedEngines {
    names: Vec<&'static str>,
}

impl UsedEngines {
    fn mark(&mut self, name: &'static str) {
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }
}
