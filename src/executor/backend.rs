//! Backend search API client.
//!
//! The backend is an opaque remote dependency: one HTTP search call per
//! variant. Everything that can go wrong on the wire — non-2xx statuses,
//! malformed JSON, timeouts — degrades to "this variant produced zero
//! hits" at the executor layer; only transport-level connect failures are
//! reported distinctly so the orchestrator can detect a backend that is
//! down entirely.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::{Result, TatkhamError};

/// One document returned by the backend for one variant.
#[derive(Clone, Debug)]
pub struct BackendHit {
    /// The document payload as returned by the backend.
    pub document: Value,

    /// The backend's ranking score, when reported.
    pub ranking_score: Option<f64>,
}

/// The parsed body of one backend search call.
#[derive(Clone, Debug, Default)]
pub struct BackendResponse {
    /// Hits in backend-reported order.
    pub hits: Vec<BackendHit>,

    /// The backend's estimate of total matching documents.
    pub estimated_total_hits: u64,
}

/// Trait over the backend search API.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute one search call against the named index.
    async fn search(
        &self,
        index: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<BackendResponse>;
}

/// HTTP client for the backend search API.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(serde::Serialize)]
struct SearchBody<'a> {
    q: &'a str,
    limit: usize,
    offset: usize,
}

#[derive(Deserialize, Default)]
struct RawSearchResponse {
    #[serde(default)]
    hits: Vec<Value>,
    #[serde(default, rename = "estimatedTotalHits")]
    estimated_total_hits: u64,
}

impl HttpBackend {
    /// Build a client from backend configuration.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TatkhamError::config(format!("cannot build HTTP client: {e}")))?;

        Ok(HttpBackend {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn classify(error: reqwest::Error) -> TatkhamError {
        if error.is_connect() {
            TatkhamError::backend_unreachable(error.to_string())
        } else {
            TatkhamError::variant_search(error.to_string())
        }
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(
        &self,
        index: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<BackendResponse> {
        let url = format!("{}/indexes/{index}/search", self.base_url);
        let mut request = self.http.post(&url).json(&SearchBody {
            q: query,
            limit,
            offset,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(Self::classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TatkhamError::variant_search(format!(
                "backend returned {status} for index '{index}'"
            )));
        }

        // A malformed body is zero hits for this variant, not an error.
        let raw: RawSearchResponse = response.json().await.unwrap_or_default();
        Ok(BackendResponse::from_raw(raw))
    }
}

impl BackendResponse {
    fn from_raw(raw: RawSearchResponse) -> Self {
        let hits = raw
            .hits
            .into_iter()
            .map(|mut document| {
                let ranking_score = match document.as_object_mut() {
                    Some(object) => object.remove("_rankingScore").and_then(|s| s.as_f64()),
                    None => None,
                };
                BackendHit {
                    document,
                    ranking_score,
                }
            })
            .collect();

        BackendResponse {
            hits,
            estimated_total_hits: raw.estimated_total_hits,
        }
    }
}

/// Extract the identity of a document for deduplication.
///
/// Uses the configured id field when present; otherwise the serialized
/// document itself, which still collapses exact duplicates.
pub fn document_identity(document: &Value, id_field: &str) -> String {
    match document.get(id_field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
        None => document.to_string(),
    }
}
