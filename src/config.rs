//! Configuration for the proxy.
//!
//! Every knob has a code-level default so the server can boot with nothing
//! but a backend URL; a JSON config file and CLI/env flags layer on top.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TatkhamError};

/// Top-level proxy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Backend search engine settings.
    pub backend: BackendConfig,

    /// Segmenter settings.
    pub segmenter: SegmenterConfig,

    /// Query-variant generation settings.
    pub variants: VariantConfig,

    /// Search executor settings.
    pub executor: ExecutorConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Merge/ranking policy.
    pub ranking: RankingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host.
    pub host: String,

    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7700,
        }
    }
}

/// Backend search engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend search API.
    pub url: String,

    /// Optional bearer API key.
    pub api_key: Option<String>,

    /// Per-call HTTP timeout in milliseconds.
    pub timeout_ms: u64,

    /// Document field used as the identity for deduplication.
    pub id_field: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7701".to_string(),
            api_key: None,
            timeout_ms: 2_000,
            id_field: "id".to_string(),
        }
    }
}

/// Segmenter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Path to the compound dictionary JSON file. Empty string disables
    /// loading at startup (the store starts with an empty snapshot).
    pub dictionary_path: String,

    /// Per-engine time budget in milliseconds. An engine that exceeds it is
    /// treated as declined, not as an error.
    pub engine_budget_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            dictionary_path: String::new(),
            engine_budget_ms: 50,
        }
    }
}

/// Query-variant generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Maximum number of variants dispatched per query. Lower-weight
    /// variants are dropped first when trimming.
    pub max_variants: usize,

    /// Queries at or below this character length also get a Partial
    /// prefix variant.
    pub partial_max_chars: usize,

    /// Per-kind weights.
    pub weights: VariantWeights,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            max_variants: 5,
            partial_max_chars: 12,
            weights: VariantWeights::default(),
        }
    }
}

/// Weights attached to generated variants. All values must be positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantWeights {
    /// The original query, unmodified.
    pub exact: f64,

    /// A single compound token found in the dictionary.
    pub compound: f64,

    /// The space-joined token sequence.
    pub component: f64,

    /// The space-joined sequence when no token came from the dictionary.
    pub fallback: f64,

    /// The prefix-wildcard variant for short queries.
    pub partial: f64,
}

impl Default for VariantWeights {
    fn default() -> Self {
        Self {
            exact: 3.0,
            compound: 2.25,
            component: 1.5,
            fallback: 0.9,
            partial: 0.5,
        }
    }
}

/// Search executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of in-flight backend calls. Excess variants queue at
    /// the admission gate until a slot frees or the deadline passes.
    pub max_concurrency: usize,

    /// Overall per-request deadline in milliseconds, propagated to every
    /// variant call.
    pub request_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(4),
            request_timeout_ms: 3_000,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the cache is consulted at all.
    pub enabled: bool,

    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,

    /// Maximum number of cached responses across all shards.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 60_000,
            capacity: 1_024,
        }
    }
}

/// Merge/ranking policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Multiplier applied to contributions from Exact variants.
    pub exact_boost: f64,

    /// Coverage factors for 1, 2, and 3-or-more distinct matching variants.
    /// Must be non-decreasing.
    pub coverage_factors: [f64; 3],
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            exact_boost: 1.5,
            coverage_factors: [1.0, 1.15, 1.25],
        }
    }
}

impl ProxyConfig {
    /// Load configuration from a JSON file, filling omitted fields with
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: ProxyConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        let w = &self.variants.weights;
        for (name, value) in [
            ("exact", w.exact),
            ("compound", w.compound),
            ("component", w.component),
            ("fallback", w.fallback),
            ("partial", w.partial),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TatkhamError::config(format!(
                    "variant weight '{name}' must be positive and finite, got {value}"
                )));
            }
        }
        if self.variants.max_variants == 0 {
            return Err(TatkhamError::config("max_variants must be at least 1"));
        }
        if self.executor.max_concurrency == 0 {
            return Err(TatkhamError::config("max_concurrency must be at least 1"));
        }
        let factors = self.ranking.coverage_factors;
        if factors.windows(2).any(|f| f[1] < f[0]) {
            return Err(TatkhamError::config(
                "coverage_factors must be non-decreasing",
            ));
        }
        Ok(())
    }

    /// Per-engine segmentation budget as a [`Duration`].
    pub fn engine_budget(&self) -> Duration {
        Duration::from_millis(self.segmenter.engine_budget_ms)
    }

    /// Overall request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.executor.request_timeout_ms)
    }

    /// Cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }
}
