//! Pure merge/rank over the combined hits of all variants.
//!
//! Hits are grouped by document identity; the combined score is a weighted
//! sum of per-variant contributions with an exact-match boost and a
//! coverage bonus for documents matched by several distinct variants. The
//! output order is deterministic given the same input, regardless of the
//! order in which backend responses arrived.

use std::cmp::Ordering;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RankingConfig;
use crate::executor::SearchHit;
use crate::variant::{QueryVariant, VariantKind};

/// Scoring policy for the merge. The constants are tunable; the contract
/// is only that exact evidence outranks weaker evidence and that more
/// distinct matching variants never lower a score.
#[derive(Clone, Debug)]
pub struct MergePolicy {
    /// Multiplier for contributions from Exact variants.
    pub exact_boost: f64,

    /// Coverage factors for 1, 2, and 3-or-more distinct variants;
    /// non-decreasing.
    pub coverage_factors: [f64; 3],
}

impl Default for MergePolicy {
    fn default() -> Self {
        let config = RankingConfig::default();
        MergePolicy {
            exact_boost: config.exact_boost,
            coverage_factors: config.coverage_factors,
        }
    }
}

impl From<&RankingConfig> for MergePolicy {
    fn from(config: &RankingConfig) -> Self {
        MergePolicy {
            exact_boost: config.exact_boost,
            coverage_factors: config.coverage_factors,
        }
    }
}

impl MergePolicy {
    /// Coverage factor for a document matched by `distinct` variants.
    /// Flat from three onward: diminishing returns end there.
    pub fn coverage(&self, distinct: usize) -> f64 {
        match distinct {
            0 | 1 => self.coverage_factors[0],
            2 => self.coverage_factors[1],
            _ => self.coverage_factors[2],
        }
    }
}

/// One deduplicated, ranked document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedResult {
    /// Document identity.
    pub doc_id: String,

    /// Combined score.
    pub score: f64,

    /// The document payload.
    pub document: Value,

    /// Query strings of the variants that matched this document;
    /// never empty.
    pub matched_variants: Vec<String>,
}

/// The full merge outcome.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MergedResults {
    /// Ranked results after pagination.
    pub results: Vec<RankedResult>,

    /// Number of distinct documents before pagination.
    pub total_hits: u64,
}

/// Merge hits from all variants into one ranked, paginated list.
///
/// Pure function of its input: no side effects, deterministic ordering.
/// `limit`/`offset` apply only after the full merge.
pub fn merge(
    hits: &[SearchHit],
    variants: &[QueryVariant],
    policy: &MergePolicy,
    limit: usize,
    offset: usize,
) -> MergedResults {
    let mut order: Vec<String> = Vec::new();
    let mut groups: AHashMap<String, DocGroup> = AHashMap::new();

    for hit in hits {
        if hit.variant_index >= variants.len() {
            continue;
        }
        let group = groups.entry(hit.doc_id.clone()).or_insert_with(|| {
            order.push(hit.doc_id.clone());
            DocGroup::new(hit.doc_id.clone(), hit.document.clone(), order.len() - 1)
        });
        // Per (document, variant) only the best raw score contributes.
        let best = group.best_by_variant.entry(hit.variant_index).or_insert(0.0);
        if hit.raw_score > *best {
            *best = hit.raw_score;
        }
    }

    let mut ranked: Vec<ScoredGroup> = order
        .iter()
        .filter_map(|doc_id| groups.remove(doc_id))
        .map(|group| group.score(variants, policy))
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.exact.cmp(&a.exact))
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });

    let total_hits = ranked.len() as u64;
    let results = ranked
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|g| g.result)
        .collect();

    MergedResults {
        results,
        total_hits,
    }
}

struct DocGroup {
    doc_id: String,
    document: Value,
    first_seen: usize,
    best_by_variant: AHashMap<usize, f64>,
}

struct ScoredGroup {
    result: RankedResult,
    score: f64,
    exact: bool,
    first_seen: usize,
}

impl DocGroup {
    fn new(doc_id: String, document: Value, first_seen: usize) -> Self {
        DocGroup {
            doc_id,
            document,
            first_seen,
            best_by_variant: AHashMap::new(),
        }
    }

    fn score(self, variants: &[QueryVariant], policy: &MergePolicy) -> ScoredGroup {
        let mut contributing: Vec<usize> = self.best_by_variant.keys().copied().collect();
        contributing.sort_unstable();

        let mut base = 0.0;
        let mut exact = false;
        for &variant_index in &contributing {
            let variant = &variants[variant_index];
            let raw = self.best_by_variant[&variant_index];
            let boost = if variant.is_kind(VariantKind::Exact) {
                exact = true;
                policy.exact_boost
            } else {
                1.0
            };
            base += raw * variant.weight * boost;
        }

        let score = base * policy.coverage(contributing.len());
        let matched_variants = contributing
            .iter()
            .map(|&i| variants[i].query.clone())
            .collect();

        ScoredGroup {
            result: RankedResult {
                doc_id: self.doc_id,
                score,
                document: self.document,
                matched_variants,
            },
            score,
            exact,
            first_seen: self.first_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant(query: &str, kind: VariantKind, weight: f64) -> QueryVariant {
        QueryVariant {
            query: query.to_string(),
            kinds: vec![kind],
            weight,
        }
    }

    fn hit(doc_id: &str, raw_score: f64, variant_index: usize) -> SearchHit {
        SearchHit {
            doc_id: doc_id.to_string(),
            raw_score,
            variant_index,
            document: json!({"id": doc_id}),
        }
    }

    fn default_variants() -> Vec<QueryVariant> {
        vec![
            variant("วากาเมะ", VariantKind::Exact, 3.0),
            variant("วากา เมะ", VariantKind::Component, 1.5),
        ]
    }

    #[test]
    fn test_dedup_and_coverage_bonus() {
        let variants = default_variants();
        let policy = MergePolicy::default();
        let hits = vec![hit("doc-1", 0.8, 0), hit("doc-1", 0.6, 1)];

        let merged = merge(&hits, &variants, &policy, 10, 0);
        assert_eq!(merged.results.len(), 1);
        assert_eq!(merged.total_hits, 1);

        let result = &merged.results[0];
        assert_eq!(result.matched_variants.len(), 2);

        // The combined score beats either contribution alone.
        let exact_alone = 0.8 * 3.0 * policy.exact_boost * policy.coverage(1);
        let component_alone = 0.6 * 1.5 * policy.coverage(1);
        assert!(result.score > exact_alone);
        assert!(result.score > component_alone);
    }

    #[test]
    fn test_matched_variants_never_empty() {
        let variants = default_variants();
        let merged = merge(
            &[hit("doc-1", 0.5, 0)],
            &variants,
            &MergePolicy::default(),
            10,
            0,
        );
        assert!(!merged.results[0].matched_variants.is_empty());
    }

    #[test]
    fn test_exact_wins_ties() {
        let variants = vec![
            variant("a", VariantKind::Exact, 1.0),
            variant("b", VariantKind::Component, 1.0),
        ];
        let policy = MergePolicy {
            exact_boost: 1.0,
            coverage_factors: [1.0, 1.0, 1.0],
        };
        // doc-2 arrives first but doc-1 holds the exact match; the scores
        // are equal, so the exact match ranks first.
        let hits = vec![hit("doc-2", 0.5, 1), hit("doc-1", 0.5, 0)];

        let merged = merge(&hits, &variants, &policy, 10, 0);
        assert_eq!(merged.results[0].doc_id, "doc-1");
    }

    #[test]
    fn test_backend_order_breaks_remaining_ties() {
        let variants = vec![variant("a", VariantKind::Component, 1.0)];
        let policy = MergePolicy::default();
        let hits = vec![hit("doc-2", 0.5, 0), hit("doc-1", 0.5, 0)];

        let merged = merge(&hits, &variants, &policy, 10, 0);
        assert_eq!(merged.results[0].doc_id, "doc-2");
        assert_eq!(merged.results[1].doc_id, "doc-1");
    }

    #[test]
    fn test_pagination_after_merge() {
        let variants = vec![variant("a", VariantKind::Exact, 1.0)];
        let hits: Vec<SearchHit> = (0..5)
            .map(|i| hit(&format!("doc-{i}"), 1.0 - i as f64 * 0.1, 0))
            .collect();

        let merged = merge(&hits, &variants, &MergePolicy::default(), 2, 1);
        assert_eq!(merged.total_hits, 5);
        assert_eq!(merged.results.len(), 2);
        assert_eq!(merged.results[0].doc_id, "doc-1");
        assert_eq!(merged.results[1].doc_id, "doc-2");
    }

    #[test]
    fn test_merge_deterministic() {
        let variants = default_variants();
        let hits = vec![
            hit("doc-1", 0.8, 0),
            hit("doc-2", 0.9, 1),
            hit("doc-1", 0.6, 1),
        ];

        let first = merge(&hits, &variants, &MergePolicy::default(), 10, 0);
        let second = merge(&hits, &variants, &MergePolicy::default(), 10, 0);

        let ids = |m: &MergedResults| -> Vec<String> {
            m.results.iter().map(|r| r.doc_id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        let scores = |m: &MergedResults| -> Vec<f64> {
            m.results.iter().map(|r| r.score).collect()
        };
        assert_eq!(scores(&first), scores(&second));
    }

    #[test]
    fn test_coverage_monotone() {
        let policy = MergePolicy::default();
        for n in 1..6 {
            assert!(policy.coverage(n + 1) >= policy.coverage(n));
        }
    }

    #[test]
    fn test_more_variants_never_score_lower() {
        let variants = default_variants();
        let policy = MergePolicy::default();

        let one = merge(&[hit("doc-1", 0.8, 0)], &variants, &policy, 10, 0);
        let two = merge(
            &[hit("doc-1", 0.8, 0), hit("doc-1", 0.6, 1)],
            &variants,
            &policy,
            10,
            0,
        );
        assert!(two.results[0].score >= one.results[0].score);
    }

    #[test]
    fn test_duplicate_hit_same_variant_keeps_best() {
        let variants = vec![variant("a", VariantKind::Exact, 2.0)];
        let policy = MergePolicy {
            exact_boost: 1.0,
            coverage_factors: [1.0, 1.0, 1.0],
        };
        let hits = vec![hit("doc-1", 0.4, 0), hit("doc-1", 0.9, 0)];

        let merged = merge(&hits, &variants, &policy, 10, 0);
        assert_eq!(merged.results.len(), 1);
        assert!((merged.results[0].score - 0.9 * 2.0).abs() < 1e-9);
        assert_eq!(merged.results[0].matched_variants.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let merged = merge(&[], &default_variants(), &MergePolicy::default(), 10, 0);
        assert!(merged.results.is_empty());
        assert_eq!(merged.total_hits, 0);
    }
}
