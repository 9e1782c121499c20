//! The proxy orchestrator: one request/response cycle over all components.
//!
//! A request moves strictly forward: received → segmented → variants
//! generated → searching → merging → cached/responded. Partial component
//! failure (a variant timing out, a fallback engine declining) never moves
//! a request backward; it proceeds to the merge with whatever hits exist.
//! Only total subsystem failure — the backend unreachable for every
//! variant — surfaces as an error distinct from a zero-hit result.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheKey, CachedSearch, ResponseCache};
use crate::config::ProxyConfig;
use crate::dictionary::{DictionaryStore, load_snapshot};
use crate::error::{Result, TatkhamError};
use crate::executor::{HttpBackend, SearchBackend, SearchExecutor};
use crate::proxy::metrics::{MetricsSnapshot, ProxyMetrics};
use crate::ranking::{MergePolicy, RankedResult, merge};
use crate::segment::{Segmentation, SegmenterChain, TokenType};
use crate::variant::{QueryVariant, VariantGenerator};

/// Caller-supplied options for one search request.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// Maximum results returned after merging.
    pub limit: usize,

    /// Results skipped after merging.
    pub offset: usize,

    /// Whether to compute and return the diagnostic [`QueryInfo`] block.
    pub include_tokenization_info: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            limit: 20,
            offset: 0,
            include_tokenization_info: false,
        }
    }
}

/// Diagnostic metadata about how a query was processed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfo {
    /// The query after trimming, as it was segmented.
    pub processed_query: String,

    /// The variants dispatched to the backend, in weight order.
    pub variants_used: Vec<QueryVariant>,

    /// Whether the query contained Thai script.
    pub thai_content_detected: bool,

    /// Segmentation engines that contributed tokens, in first-use order.
    pub engines_used: Vec<String>,

    /// Whether any variant failed or was abandoned at the deadline.
    pub degraded: bool,

    /// Query strings of variants that did not complete.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_variants: Vec<String>,
}

/// The outcome of one proxied search.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Deduplicated, ranked hits after pagination.
    pub results: Vec<RankedResult>,

    /// Distinct documents before pagination.
    pub total_hits: u64,

    /// Diagnostics, present when the caller asked for them.
    pub query_info: Option<QueryInfo>,

    /// Whether this response was served from the cache.
    pub from_cache: bool,
}

/// Liveness and snapshot info for the observability collector.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    /// Always `"ok"` when the process can answer at all.
    pub status: &'static str,

    /// Crate version.
    pub version: &'static str,

    /// Seconds since the proxy was constructed.
    pub uptime_seconds: i64,

    /// Terms in the current dictionary snapshot.
    pub dictionary_terms: usize,

    /// Version of the current dictionary snapshot.
    pub dictionary_version: u64,

    /// Live response-cache entries, when the cache is enabled.
    pub cache_entries: Option<usize>,
}

/// The proxy: owns every component and wires one request through them.
pub struct SearchProxy {
    config: ProxyConfig,
    dictionary: Arc<DictionaryStore>,
    segmenter: SegmenterChain,
    generator: VariantGenerator,
    executor: SearchExecutor,
    policy: MergePolicy,
    cache: Option<ResponseCache>,
    metrics: Arc<ProxyMetrics>,
    started_at: DateTime<Utc>,
}

impl SearchProxy {
    /// Create a proxy over an explicit backend and dictionary store.
    pub fn new(
        config: ProxyConfig,
        backend: Arc<dyn SearchBackend>,
        dictionary: Arc<DictionaryStore>,
    ) -> Result<Self> {
        config.validate()?;

        let segmenter = SegmenterChain::new(Arc::clone(&dictionary), config.engine_budget());
        let generator = VariantGenerator::new(config.variants.clone());
        let executor = SearchExecutor::new(
            backend,
            config.executor.max_concurrency,
            config.backend.id_field.clone(),
        );
        let policy = MergePolicy::from(&config.ranking);
        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(config.cache_ttl(), config.cache.capacity));

        Ok(SearchProxy {
            config,
            dictionary,
            segmenter,
            generator,
            executor,
            policy,
            cache,
            metrics: Arc::new(ProxyMetrics::new()),
            started_at: Utc::now(),
        })
    }

    /// Create a proxy from configuration alone: HTTP backend, dictionary
    /// loaded from the configured path (or empty when no path is set).
    pub fn from_config(config: ProxyConfig) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(&config.backend)?);
        let dictionary = if config.segmenter.dictionary_path.is_empty() {
            Arc::new(DictionaryStore::empty())
        } else {
            let entries = load_snapshot(&config.segmenter.dictionary_path)?;
            Arc::new(DictionaryStore::new(entries))
        };
        Self::new(config, backend, dictionary)
    }

    /// Execute one full search cycle.
    pub async fn search(
        &self,
        query: &str,
        index: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(TatkhamError::invalid_argument("query must not be empty"));
        }
        if index.is_empty() {
            return Err(TatkhamError::invalid_argument("index must not be empty"));
        }

        let key = CacheKey::new(
            query,
            index,
            options.limit,
            options.offset,
            options.include_tokenization_info,
        );
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key) {
                self.metrics.record_cache(true);
                self.metrics.record_search(started.elapsed(), false);
                return Ok(SearchOutcome {
                    results: cached.results.clone(),
                    total_hits: cached.total_hits,
                    query_info: cached.query_info.clone(),
                    from_cache: true,
                });
            }
            self.metrics.record_cache(false);
        }

        let request_id = Uuid::new_v4();
        let segmentation = self.segmenter.segment(query)?;
        debug!(
            %request_id,
            tokens = segmentation.tokens.len(),
            engines = ?segmentation.engines_used,
            "query segmented"
        );

        let variants = self.generator.generate(query, &segmentation);
        debug!(%request_id, variants = variants.len(), "variants generated");

        let report = self
            .executor
            .execute(
                &variants,
                index,
                options.limit,
                options.offset,
                self.config.request_timeout(),
            )
            .await;

        if report.backend_unreachable() {
            self.metrics.record_backend_unreachable();
            return Err(TatkhamError::backend_unreachable(format!(
                "no variant could reach the backend for index '{index}'"
            )));
        }

        let merged = merge(
            &report.hits,
            &variants,
            &self.policy,
            options.limit,
            options.offset,
        );
        let degraded = report.degraded();

        let query_info = options.include_tokenization_info.then(|| QueryInfo {
            processed_query: query.to_string(),
            variants_used: variants.clone(),
            thai_content_detected: segmentation
                .tokens
                .iter()
                .any(|t| t.token_type == TokenType::Thai),
            engines_used: segmentation
                .engines_used
                .iter()
                .map(|e| e.to_string())
                .collect(),
            degraded,
            failed_variants: report
                .failed_queries()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });

        if let Some(cache) = &self.cache {
            // A degraded response is not cached: the next request should
            // retry the full fan-out.
            if !degraded {
                cache.put(
                    key,
                    CachedSearch {
                        results: merged.results.clone(),
                        total_hits: merged.total_hits,
                        query_info: query_info.clone(),
                    },
                );
            }
        }

        self.metrics.record_search(started.elapsed(), degraded);
        Ok(SearchOutcome {
            results: merged.results,
            total_hits: merged.total_hits,
            query_info,
            from_cache: false,
        })
    }

    /// Execute a batch of queries concurrently, preserving input order.
    pub async fn search_batch(
        &self,
        queries: &[String],
        index: &str,
        options: &SearchOptions,
    ) -> Vec<Result<SearchOutcome>> {
        let calls = queries.iter().map(|query| self.search(query, index, options));
        futures::future::join_all(calls).await
    }

    /// Segment text without searching, optionally with one named engine.
    pub fn tokenize(&self, text: &str, engine: Option<&str>) -> Result<Segmentation> {
        self.metrics.record_tokenize();
        match engine {
            Some(name) => self.segmenter.segment_with(name, text),
            None => self.segmenter.segment(text),
        }
    }

    /// Reload the dictionary from the configured path and swap the
    /// snapshot atomically. In-flight requests keep their snapshot.
    pub fn reload_dictionary(&self) -> Result<(usize, u64)> {
        let path = &self.config.segmenter.dictionary_path;
        if path.is_empty() {
            return Err(TatkhamError::dictionary(
                "no dictionary path configured; cannot reload",
            ));
        }
        let entries = load_snapshot(path)?;
        let snapshot = self.dictionary.reload(entries);
        self.metrics.record_reload();
        Ok((snapshot.term_count(), snapshot.version()))
    }

    /// Names of all segmentation engines, primary first.
    pub fn engine_names(&self) -> Vec<&'static str> {
        self.segmenter.engine_names()
    }

    /// Point-in-time copy of the request counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Liveness report.
    pub fn health(&self) -> HealthReport {
        let snapshot = self.dictionary.snapshot();
        HealthReport {
            status: "ok",
            version: crate::VERSION,
            uptime_seconds: (Utc::now() - self.started_at).num_seconds(),
            dictionary_terms: snapshot.term_count(),
            dictionary_version: snapshot.version(),
            cache_entries: self.cache.as_ref().map(|c| c.len()),
        }
    }

    /// The configuration this proxy was built with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::dictionary::DictionaryEntry;
    use crate::executor::{BackendHit, BackendResponse};

    /// Backend serving one fixed document for any query that is a
    /// substring of its content.
    struct FixtureBackend {
        content: String,
        delay: Duration,
    }

    #[async_trait]
    impl SearchBackend for FixtureBackend {
        async fn search(
            &self,
            _index: &str,
            query: &str,
            _limit: usize,
            _offset: usize,
        ) -> Result<BackendResponse> {
            tokio::time::sleep(self.delay).await;
            let needle = query.trim_end_matches('*');
            if needle.split_whitespace().any(|part| self.content.contains(part)) {
                Ok(BackendResponse {
                    hits: vec![BackendHit {
                        document: json!({"id": "doc-1", "content": self.content}),
                        ranking_score: Some(0.9),
                    }],
                    estimated_total_hits: 1,
                })
            } else {
                Ok(BackendResponse::default())
            }
        }
    }

    fn proxy_with(content: &str, terms: &[&str]) -> SearchProxy {
        let entries = terms
            .iter()
            .map(|t| DictionaryEntry::new(*t, "compound").with_confidence(0.95))
            .collect();
        SearchProxy::new(
            ProxyConfig::default(),
            Arc::new(FixtureBackend {
                content: content.to_string(),
                delay: Duration::from_millis(1),
            }),
            Arc::new(DictionaryStore::new(entries)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_compound_query_finds_embedded_document() {
        let proxy = proxy_with("สาหร่ายวากาเมะ", &["วากาเมะ"]);
        let options = SearchOptions {
            include_tokenization_info: true,
            ..Default::default()
        };

        let outcome = proxy.search("วากาเมะ", "items", &options).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].doc_id, "doc-1");

        // The exact variant is among the matches.
        assert!(
            outcome.results[0]
                .matched_variants
                .contains(&"วากาเมะ".to_string())
        );

        let info = outcome.query_info.unwrap();
        assert!(info.thai_content_detected);
        assert!(!info.degraded);
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let proxy = proxy_with("สาหร่ายวากาเมะ", &["วากาเมะ"]);
        let options = SearchOptions::default();

        let first = proxy.search("วากาเมะ", "items", &options).await.unwrap();
        assert!(!first.from_cache);

        let second = proxy.search("วากาเมะ", "items", &options).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.total_hits, first.total_hits);

        let metrics = proxy.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.searches_total, 2);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let proxy = proxy_with("x", &[]);
        let result = proxy
            .search("   ", "items", &SearchOptions::default())
            .await;
        assert!(matches!(result, Err(TatkhamError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_backend_unreachable_is_distinct_error() {
        struct DownBackend;

        #[async_trait]
        impl SearchBackend for DownBackend {
            async fn search(
                &self,
                _index: &str,
                _query: &str,
                _limit: usize,
                _offset: usize,
            ) -> Result<BackendResponse> {
                Err(TatkhamError::backend_unreachable("connect refused"))
            }
        }

        let proxy = SearchProxy::new(
            ProxyConfig::default(),
            Arc::new(DownBackend),
            Arc::new(DictionaryStore::empty()),
        )
        .unwrap();

        let result = proxy
            .search("วากาเมะ", "items", &SearchOptions::default())
            .await;
        assert!(matches!(result, Err(TatkhamError::BackendUnreachable(_))));
        assert_eq!(proxy.metrics().backend_unreachable_total, 1);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let proxy = proxy_with("สาหร่ายวากาเมะ", &["วากาเมะ"]);
        let queries = vec![
            "วากาเมะ".to_string(),
            "ไม่มีแน่นอน".to_string(),
            "สาหร่าย".to_string(),
        ];

        let outcomes = proxy
            .search_batch(&queries, "items", &SearchOptions::default())
            .await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().results.len(), 1);
        assert_eq!(outcomes[1].as_ref().unwrap().results.len(), 0);
        assert_eq!(outcomes[2].as_ref().unwrap().results.len(), 1);
    }

    #[tokio::test]
    async fn test_tokenize_with_engine_override() {
        let proxy = proxy_with("x", &["วากาเมะ"]);

        let with_dictionary = proxy.tokenize("วากาเมะ", None).unwrap();
        assert!(with_dictionary.has_compound());

        let char_split = proxy.tokenize("วากาเมะ", Some("char_split")).unwrap();
        assert!(!char_split.has_compound());

        assert!(proxy.tokenize("x", Some("unknown")).is_err());
        assert_eq!(proxy.metrics().tokenize_total, 3);
    }

    #[tokio::test]
    async fn test_health_reports_dictionary() {
        let proxy = proxy_with("x", &["วากาเมะ", "สาหร่าย"]);
        let health = proxy.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.dictionary_terms, 2);
        assert!(health.cache_entries.is_some());
    }
}
