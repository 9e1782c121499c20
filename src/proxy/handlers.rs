//! HTTP handlers and wire DTOs.
//!
//! The wire contract uses camelCase field names; internal types stay
//! snake_case and are mapped here. Errors become structured
//! `{error: {code, message}}` bodies with a stable machine-readable code;
//! internal messages never leak beyond the codes defined in
//! [`TatkhamError::code`].

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TatkhamError;
use crate::proxy::orchestrator::{
    HealthReport, QueryInfo, SearchOptions, SearchOutcome, SearchProxy,
};
use crate::proxy::metrics::MetricsSnapshot;
use crate::ranking::RankedResult;
use crate::segment::Token;

/// Request body for `POST /search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// The user query.
    pub query: String,

    /// Backend index to search.
    pub index: String,

    /// Optional paging and diagnostics options.
    #[serde(default)]
    pub options: SearchOptionsBody,
}

/// Request body for `POST /search/batch`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSearchRequest {
    /// Queries in response order.
    pub queries: Vec<String>,

    /// Backend index to search.
    pub index: String,

    /// Options shared by every query in the batch.
    #[serde(default)]
    pub options: SearchOptionsBody,
}

/// The `options` object of a search request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptionsBody {
    /// Maximum results returned.
    pub limit: Option<usize>,

    /// Results skipped.
    pub offset: Option<usize>,

    /// Whether to include the `queryInfo` diagnostic block.
    pub include_tokenization_info: Option<bool>,
}

impl SearchOptionsBody {
    fn into_options(self) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
            include_tokenization_info: self
                .include_tokenization_info
                .unwrap_or(defaults.include_tokenization_info),
        }
    }
}

/// Response body for `POST /search`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Ranked hits.
    pub hits: Vec<HitBody>,

    /// Distinct matching documents before pagination.
    pub total_hits: u64,

    /// Diagnostics, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_info: Option<QueryInfo>,
}

/// One hit on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitBody {
    /// The backend document.
    pub document: Value,

    /// Combined relevance score.
    pub score: f64,

    /// Variant query strings that matched this document.
    pub matched_variants: Vec<String>,
}

impl From<RankedResult> for HitBody {
    fn from(result: RankedResult) -> Self {
        HitBody {
            document: result.document,
            score: result.score,
            matched_variants: result.matched_variants,
        }
    }
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        SearchResponse {
            hits: outcome.results.into_iter().map(HitBody::from).collect(),
            total_hits: outcome.total_hits,
            query_info: outcome.query_info,
        }
    }
}

/// One element of the batch response: a search response or a per-query
/// error, preserving input order either way.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    /// The query succeeded.
    Ok(SearchResponse),
    /// The query failed.
    Err {
        /// Structured error for this query.
        error: ErrorBody,
    },
}

/// Request body for `POST /tokenize`.
#[derive(Debug, Deserialize)]
pub struct TokenizeRequest {
    /// Text to segment.
    pub text: String,

    /// Optional engine override (`lexicon`, `cluster`, `char_split`).
    pub engine: Option<String>,
}

/// Response body for `POST /tokenize`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResponse {
    /// Tokens in input order.
    pub tokens: Vec<TokenBody>,

    /// The engine that was asked for (`dictionary` when unset).
    pub engine: String,

    /// Wall-clock segmentation time.
    pub processing_time_ms: u64,
}

/// One token on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBody {
    /// Token text.
    pub text: String,

    /// Character offset of the first character.
    pub start_index: usize,

    /// Character offset one past the last character.
    pub end_index: usize,

    /// Whether the token matched a dictionary term.
    pub is_compound: bool,

    /// Segmentation confidence.
    pub confidence: f32,
}

impl From<Token> for TokenBody {
    fn from(token: Token) -> Self {
        TokenBody {
            text: token.text,
            start_index: token.start,
            end_index: token.end,
            is_compound: token.is_compound,
            confidence: token.confidence,
        }
    }
}

/// Response body for `POST /dictionary/reload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    /// Terms in the new snapshot.
    pub terms: usize,

    /// Version of the new snapshot.
    pub version: u64,
}

/// Structured error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,

    /// Human-readable message.
    pub message: String,
}

/// A [`TatkhamError`] rendered as an HTTP response.
pub struct ApiError(TatkhamError);

impl From<TatkhamError> for ApiError {
    fn from(error: TatkhamError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TatkhamError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            TatkhamError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "error": ErrorBody {
                code: self.0.code(),
                message: self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

/// `POST /search`
pub async fn search(
    State(proxy): State<Arc<SearchProxy>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let options = request.options.into_options();
    let outcome = proxy
        .search(&request.query, &request.index, &options)
        .await?;
    Ok(Json(outcome.into()))
}

/// `POST /search/batch`
pub async fn search_batch(
    State(proxy): State<Arc<SearchProxy>>,
    Json(request): Json<BatchSearchRequest>,
) -> Json<Vec<BatchItem>> {
    let options = request.options.into_options();
    let outcomes = proxy
        .search_batch(&request.queries, &request.index, &options)
        .await;

    let items = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(outcome) => BatchItem::Ok(outcome.into()),
            Err(error) => BatchItem::Err {
                error: ErrorBody {
                    code: error.code(),
                    message: error.to_string(),
                },
            },
        })
        .collect();
    Json(items)
}

/// `POST /tokenize`
pub async fn tokenize(
    State(proxy): State<Arc<SearchProxy>>,
    Json(request): Json<TokenizeRequest>,
) -> Result<Json<TokenizeResponse>, ApiError> {
    let started = Instant::now();
    let segmentation = proxy.tokenize(&request.text, request.engine.as_deref())?;

    Ok(Json(TokenizeResponse {
        tokens: segmentation
            .tokens
            .into_iter()
            .map(TokenBody::from)
            .collect(),
        engine: request
            .engine
            .unwrap_or_else(|| crate::segment::chain::DICTIONARY_ENGINE.to_string()),
        processing_time_ms: started.elapsed().as_millis() as u64,
    }))
}

/// `POST /dictionary/reload`
pub async fn reload_dictionary(
    State(proxy): State<Arc<SearchProxy>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let (terms, version) = proxy.reload_dictionary()?;
    Ok(Json(ReloadResponse { terms, version }))
}

/// `GET /health`
pub async fn health(State(proxy): State<Arc<SearchProxy>>) -> Json<HealthReport> {
    Json(proxy.health())
}

/// `GET /metrics`
pub async fn metrics(State(proxy): State<Arc<SearchProxy>>) -> Json<MetricsSnapshot> {
    Json(proxy.metrics())
}
