//! Expanding one user query into weighted search variants.
//!
//! A space-free compound query misses documents where the backend indexed
//! the decomposed parts, and vice versa. The generator therefore produces
//! an ordered set of alternative query strings: the exact query, the
//! space-joined segmentation, each dictionary compound on its own, and a
//! prefix variant for short queries. Variants are weighted so the merger
//! can prefer exact evidence, and the set is capped to bound fan-out cost.
//!
//! Generation is deterministic: the same query against the same dictionary
//! snapshot always yields the same variants in the same order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::config::VariantConfig;
use crate::segment::Segmentation;

/// How a variant was derived from the query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// The original query, unmodified.
    Exact,
    /// Derived from segmented components (joined sequence or a single
    /// dictionary compound).
    Component,
    /// Prefix/substring widening for short queries.
    Partial,
    /// Derived from a segmentation that never touched the dictionary.
    Fallback,
}

/// One alternative query string with its weight.
///
/// Duplicate strings produced by different derivations are merged, keeping
/// the highest weight and the union of kinds; the first kind is the primary
/// derivation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryVariant {
    /// The query string sent to the backend.
    pub query: String,

    /// All derivations that produced this string, insertion-ordered.
    pub kinds: Vec<VariantKind>,

    /// Positive, finite scoring weight.
    pub weight: f64,
}

impl QueryVariant {
    /// Whether this variant carries the given kind.
    pub fn is_kind(&self, kind: VariantKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Generates the variant set for one query.
#[derive(Clone, Debug)]
pub struct VariantGenerator {
    config: VariantConfig,
}

impl VariantGenerator {
    /// Create a generator with the given configuration.
    pub fn new(config: VariantConfig) -> Self {
        VariantGenerator { config }
    }

    /// Generate the weighted variant set for a query and its segmentation.
    ///
    /// The returned list is sorted by weight descending and capped at the
    /// configured maximum; lower-weight variants are dropped first.
    pub fn generate(&self, query: &str, segmentation: &Segmentation) -> Vec<QueryVariant> {
        let weights = &self.config.weights;
        let query = query.trim();
        let mut set = VariantSet::default();

        // 1. The exact query always leads.
        set.add(query.to_string(), VariantKind::Exact, weights.exact);

        // 2. The space-joined token sequence, when it actually decomposes
        //    the query. A segmentation that never touched the dictionary is
        //    weaker evidence and is marked as such.
        let words = segmentation.word_texts();
        if words.len() > 1 {
            let joined = words.join(" ");
            if segmentation.has_compound() {
                set.add(joined, VariantKind::Component, weights.component);
            } else {
                set.add(joined, VariantKind::Fallback, weights.fallback);
            }
        }

        // 3. Each dictionary compound on its own.
        for token in segmentation.tokens.iter().filter(|t| t.is_compound) {
            set.add(token.text.clone(), VariantKind::Component, weights.compound);
        }

        // 4. Prefix widening for short queries.
        if query.chars().count() <= self.config.partial_max_chars {
            set.add(format!("{query}*"), VariantKind::Partial, weights.partial);
        }

        let mut variants = set.into_variants();
        // Stable sort keeps insertion order among equal weights, so the
        // result is deterministic.
        variants.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        variants.truncate(self.config.max_variants);
        variants
    }
}

/// Insertion-ordered variant accumulator with string-level deduplication.
#[derive(Default)]
struct VariantSet {
    order: Vec<String>,
    by_query: AHashMap<String, QueryVariant>,
}

impl VariantSet {
    fn add(&mut self, query: String, kind: VariantKind, weight: f64) {
        if query.is_empty() {
            return;
        }
        match self.by_query.get_mut(&query) {
            Some(existing) => {
                if !existing.kinds.contains(&kind) {
                    existing.kinds.push(kind);
                }
                existing.weight = existing.weight.max(weight);
            }
            None => {
                self.order.push(query.clone());
                self.by_query.insert(
                    query.clone(),
                    QueryVariant {
                        query,
                        kinds: vec![kind],
                        weight,
                    },
                );
            }
        }
    }

    fn into_variants(mut self) -> Vec<QueryVariant> {
        self.order
            .iter()
            .filter_map(|q| self.by_query.remove(q))
            .collect()
    }
}
