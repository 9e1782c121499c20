//! End-to-end proxy scenarios over a scripted backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tatkham::config::ProxyConfig;
use tatkham::dictionary::{DictionaryEntry, DictionaryStore};
use tatkham::error::{Result, TatkhamError};
use tatkham::executor::{
    BackendHit, BackendResponse, SearchBackend, SearchExecutor, VariantState,
};
use tatkham::proxy::{SearchOptions, SearchProxy};
use tatkham::variant::{QueryVariant, VariantKind};

/// Backend over a fixed document set: a query matches a document when any
/// space-separated part of it (prefix `*` stripped) occurs in the content.
struct ScriptedBackend {
    documents: Vec<(String, String)>,
    slow_queries: Vec<String>,
    delay: Duration,
}

impl ScriptedBackend {
    fn new(documents: &[(&str, &str)]) -> Self {
        ScriptedBackend {
            documents: documents
                .iter()
                .map(|(id, content)| (id.to_string(), content.to_string()))
                .collect(),
            slow_queries: Vec::new(),
            delay: Duration::from_secs(60),
        }
    }

    fn with_slow_query(mut self, query: &str) -> Self {
        self.slow_queries.push(query.to_string());
        self
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn search(
        &self,
        _index: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<BackendResponse> {
        if self.slow_queries.iter().any(|q| q == query) {
            tokio::time::sleep(self.delay).await;
        }

        let hits: Vec<BackendHit> = self
            .documents
            .iter()
            .filter(|(_, content)| {
                query
                    .split_whitespace()
                    .map(|part| part.trim_end_matches('*'))
                    .any(|part| !part.is_empty() && content.contains(part))
            })
            .skip(offset)
            .take(limit)
            .map(|(id, content)| BackendHit {
                document: json!({"id": id, "content": content}),
                ranking_score: Some(0.8),
            })
            .collect();

        let estimated_total_hits = hits.len() as u64;
        Ok(BackendResponse {
            hits,
            estimated_total_hits,
        })
    }
}

fn wakame_proxy(backend: ScriptedBackend) -> SearchProxy {
    let mut config = ProxyConfig::default();
    config.executor.request_timeout_ms = 500;
    SearchProxy::new(
        config,
        Arc::new(backend),
        Arc::new(DictionaryStore::new(vec![
            DictionaryEntry::new("วากาเมะ", "compound").with_confidence(0.95),
        ])),
    )
    .unwrap()
}

/// Scenario B: a compound query finds a document that only contains the
/// compound inside a longer word, and the exact variant is credited.
#[tokio::test]
async fn compound_query_matches_embedded_compound() {
    let proxy = wakame_proxy(ScriptedBackend::new(&[
        ("doc-1", "สาหร่ายวากาเมะ"),
        ("doc-2", "ข้าวผัดกุ้ง"),
    ]));

    let outcome = proxy
        .search("วากาเมะ", "items", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].doc_id, "doc-1");
    assert!(
        outcome.results[0]
            .matched_variants
            .contains(&"วากาเมะ".to_string())
    );
}

/// Scenario C: one straggler variant is abandoned at the deadline while
/// the others complete, and the response does not wait for it.
#[tokio::test(start_paused = true)]
async fn straggler_variant_abandoned_at_deadline() {
    let backend = ScriptedBackend::new(&[("doc-1", "abcd")]).with_slow_query("c");
    let executor = SearchExecutor::new(Arc::new(backend), 8, "id".to_string());

    let variants: Vec<QueryVariant> = ["a", "b", "c", "d"]
        .iter()
        .map(|q| QueryVariant {
            query: q.to_string(),
            kinds: vec![VariantKind::Component],
            weight: 1.0,
        })
        .collect();

    let started = tokio::time::Instant::now();
    let report = executor
        .execute(&variants, "items", 10, 0, Duration::from_millis(200))
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.statuses[0].state, VariantState::Completed);
    assert_eq!(report.statuses[1].state, VariantState::Completed);
    assert_eq!(report.statuses[2].state, VariantState::TimedOut);
    assert_eq!(report.statuses[3].state, VariantState::Completed);
    assert_eq!(report.hits.len(), 3);
}

/// A degraded request still answers, flags the failure in the
/// diagnostics, and is not cached.
#[tokio::test]
async fn degraded_response_keeps_partial_hits() {
    struct HalfBrokenBackend;

    #[async_trait]
    impl SearchBackend for HalfBrokenBackend {
        async fn search(
            &self,
            _index: &str,
            query: &str,
            _limit: usize,
            _offset: usize,
        ) -> Result<BackendResponse> {
            if query.ends_with('*') {
                return Err(TatkhamError::variant_search("wildcard unsupported"));
            }
            Ok(BackendResponse {
                hits: vec![BackendHit {
                    document: json!({"id": "doc-1"}),
                    ranking_score: None,
                }],
                estimated_total_hits: 1,
            })
        }
    }

    let proxy = SearchProxy::new(
        ProxyConfig::default(),
        Arc::new(HalfBrokenBackend),
        Arc::new(DictionaryStore::empty()),
    )
    .unwrap();

    let options = SearchOptions {
        include_tokenization_info: true,
        ..Default::default()
    };
    let outcome = proxy.search("ปลา", "items", &options).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    let info = outcome.query_info.unwrap();
    assert!(info.degraded);
    assert!(info.failed_variants.iter().any(|q| q.ends_with('*')));

    // The degraded response was not cached.
    let again = proxy.search("ปลา", "items", &options).await.unwrap();
    assert!(!again.from_cache);
}

#[tokio::test]
async fn cache_expires_after_ttl() {
    let mut config = ProxyConfig::default();
    config.cache.ttl_ms = 30;

    let proxy = SearchProxy::new(
        config,
        Arc::new(ScriptedBackend::new(&[("doc-1", "สาหร่ายวากาเมะ")])),
        Arc::new(DictionaryStore::empty()),
    )
    .unwrap();

    let options = SearchOptions::default();
    let first = proxy.search("วากาเมะ", "items", &options).await.unwrap();
    assert!(!first.from_cache);

    let second = proxy.search("วากาเมะ", "items", &options).await.unwrap();
    assert!(second.from_cache);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let third = proxy.search("วากาเมะ", "items", &options).await.unwrap();
    assert!(!third.from_cache);
}

#[tokio::test]
async fn batch_responses_preserve_input_order() {
    let proxy = wakame_proxy(ScriptedBackend::new(&[
        ("doc-1", "สาหร่ายวากาเมะ"),
        ("doc-2", "น้ำปลาแท้"),
    ]));

    let queries = vec![
        "น้ำปลา".to_string(),
        "".to_string(),
        "วากาเมะ".to_string(),
    ];
    let outcomes = proxy
        .search_batch(&queries, "items", &SearchOptions::default())
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].as_ref().unwrap().results[0].doc_id, "doc-2");
    // The empty query fails alone; its neighbors are unaffected.
    assert!(matches!(
        outcomes[1],
        Err(TatkhamError::InvalidArgument(_))
    ));
    assert_eq!(outcomes[2].as_ref().unwrap().results[0].doc_id, "doc-1");
}

#[tokio::test]
async fn dictionary_reload_changes_variants() {
    let store = Arc::new(DictionaryStore::empty());
    let mut config = ProxyConfig::default();
    config.cache.enabled = false;

    let proxy = SearchProxy::new(
        config,
        Arc::new(ScriptedBackend::new(&[("doc-1", "สาหร่ายวากาเมะ")])),
        Arc::clone(&store),
    )
    .unwrap();

    let options = SearchOptions {
        include_tokenization_info: true,
        ..Default::default()
    };

    let before = proxy
        .search("กินวากาเมะ", "items", &options)
        .await
        .unwrap();
    let info = before.query_info.unwrap();
    assert!(!info.variants_used.iter().any(|v| v.query == "วากาเมะ"));

    store.reload(vec![
        DictionaryEntry::new("วากาเมะ", "compound").with_confidence(0.95),
    ]);

    let after = proxy
        .search("กินวากาเมะ", "items", &options)
        .await
        .unwrap();
    let info = after.query_info.unwrap();
    assert!(info.variants_used.iter().any(|v| v.query == "วากาเมะ"));
}
