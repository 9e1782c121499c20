//! Concurrent variant fan-out with one shared deadline.
//!
//! One backend call per variant, all in flight at once up to the
//! concurrency cap; excess variants queue at a semaphore instead of being
//! rejected. Every call is bounded by the request deadline, and a variant
//! that times out or errors contributes no hits without failing the
//! request. The executor returns as soon as every variant has completed or
//! been abandoned at the deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::TatkhamError;
use crate::executor::backend::{SearchBackend, document_identity};
use crate::variant::QueryVariant;

/// One (variant, document) pair returned by the backend.
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Document identity used for deduplication.
    pub doc_id: String,

    /// Raw backend score; 1.0 when the backend reports none.
    pub raw_score: f64,

    /// Index into the dispatched variant list.
    pub variant_index: usize,

    /// The document payload.
    pub document: Value,
}

/// Terminal state of one variant call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantState {
    /// The call completed; its hits are included.
    Completed,
    /// The call failed (HTTP error, malformed request).
    Failed,
    /// The backend could not be reached at transport level.
    Unreachable,
    /// The call was abandoned at the deadline.
    TimedOut,
}

/// Per-variant execution status, for diagnostics and degradation flags.
#[derive(Clone, Debug, Serialize)]
pub struct VariantStatus {
    /// The variant's query string.
    pub query: String,

    /// How the call ended.
    pub state: VariantState,

    /// Number of hits contributed.
    pub hit_count: usize,

    /// Wall-clock time spent on this variant, including queueing.
    pub elapsed_ms: u64,
}

/// The outcome of executing one variant set.
#[derive(Clone, Debug, Default)]
pub struct ExecutionReport {
    /// All hits from all completed variants, in (variant, backend) order.
    pub hits: Vec<SearchHit>,

    /// One status per dispatched variant, in dispatch order.
    pub statuses: Vec<VariantStatus>,

    /// Largest total-hits estimate reported by any completed variant.
    pub max_estimated_total: u64,
}

impl ExecutionReport {
    /// Whether every dispatched variant failed at transport level.
    pub fn backend_unreachable(&self) -> bool {
        !self.statuses.is_empty()
            && self
                .statuses
                .iter()
                .all(|s| s.state == VariantState::Unreachable)
    }

    /// Whether any variant failed or was abandoned.
    pub fn degraded(&self) -> bool {
        self.statuses
            .iter()
            .any(|s| s.state != VariantState::Completed)
    }

    /// Queries of variants that did not complete.
    pub fn failed_queries(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|s| s.state != VariantState::Completed)
            .map(|s| s.query.as_str())
            .collect()
    }
}

/// Dispatches variant searches concurrently under one deadline.
pub struct SearchExecutor {
    backend: Arc<dyn SearchBackend>,
    semaphore: Arc<Semaphore>,
    id_field: String,
}

impl SearchExecutor {
    /// Create an executor over the given backend.
    pub fn new(backend: Arc<dyn SearchBackend>, max_concurrency: usize, id_field: String) -> Self {
        SearchExecutor {
            backend,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            id_field,
        }
    }

    /// Execute all variants against the index, returning whatever
    /// completed by the deadline.
    ///
    /// `limit` and `offset` describe the caller's pagination; each variant
    /// fetches `limit + offset` documents so the merger can paginate after
    /// deduplication without per-variant truncation bias.
    pub async fn execute(
        &self,
        variants: &[QueryVariant],
        index: &str,
        limit: usize,
        offset: usize,
        deadline: Duration,
    ) -> ExecutionReport {
        let deadline_at = tokio::time::Instant::now() + deadline;
        let fetch_limit = limit + offset;

        let calls = variants.iter().enumerate().map(|(variant_index, variant)| {
            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&self.semaphore);
            let query = variant.query.clone();
            let index = index.to_string();

            async move {
                let started = Instant::now();
                let outcome = tokio::time::timeout_at(deadline_at, async move {
                    // Admission gate: queue rather than reject. Queueing
                    // time counts against the deadline.
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| TatkhamError::other("executor semaphore closed"))?;
                    backend.search(&index, &query, fetch_limit, 0).await
                })
                .await;
                (variant_index, started.elapsed(), outcome)
            }
        });

        let mut report = ExecutionReport::default();
        for (variant_index, elapsed, outcome) in futures::future::join_all(calls).await {
            let query = variants[variant_index].query.clone();
            let elapsed_ms = elapsed.as_millis() as u64;

            let (state, hit_count) = match outcome {
                Ok(Ok(response)) => {
                    let hit_count = response.hits.len();
                    report.max_estimated_total =
                        report.max_estimated_total.max(response.estimated_total_hits);
                    for hit in response.hits {
                        report.hits.push(SearchHit {
                            doc_id: document_identity(&hit.document, &self.id_field),
                            raw_score: hit.ranking_score.unwrap_or(1.0),
                            variant_index,
                            document: hit.document,
                        });
                    }
                    (VariantState::Completed, hit_count)
                }
                Ok(Err(TatkhamError::BackendUnreachable(reason))) => {
                    debug!(query = %query, %reason, "variant backend unreachable");
                    (VariantState::Unreachable, 0)
                }
                Ok(Err(error)) => {
                    debug!(query = %query, %error, "variant search failed");
                    (VariantState::Failed, 0)
                }
                Err(_) => {
                    debug!(query = %query, "variant abandoned at deadline");
                    (VariantState::TimedOut, 0)
                }
            };

            report.statuses.push(VariantStatus {
                query,
                state,
                hit_count,
                elapsed_ms,
            });
        }

        report
    }
}
