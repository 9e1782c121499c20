//! Error types for the Tatkham proxy.
//!
//! All fallible operations in the crate return [`Result`], backed by the
//! [`TatkhamError`] enum. The taxonomy mirrors how failures propagate:
//! component-local conditions (a single segmentation engine declining, a
//! single variant search failing) are absorbed before they become errors,
//! so the variants here are the ones that actually cross a component
//! boundary.
//!
//! # Examples
//!
//! ```
//! use tatkham::error::{Result, TatkhamError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TatkhamError::invalid_argument("unknown engine name"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Tatkham operations.
#[derive(Error, Debug)]
pub enum TatkhamError {
    /// I/O errors (dictionary files, network sockets).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors (invalid values, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dictionary load/reload errors.
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// Every segmentation engine declined the input. Only reachable when the
    /// chain was built without its character-split last resort, which is a
    /// deployment defect rather than a runtime condition.
    #[error("Segmentation engines exhausted: {0}")]
    EnginesExhausted(String),

    /// A single variant search against the backend failed. Absorbed by the
    /// executor; surfaced only through per-variant status metadata.
    #[error("Variant search failed: {0}")]
    VariantSearch(String),

    /// The backend could not be reached for any variant. Distinct from a
    /// valid zero-hit result so callers can tell "nothing matched" from
    /// "we could not ask".
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    /// Invalid caller-supplied argument (empty query, unknown engine name).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with [`TatkhamError`].
pub type Result<T> = std::result::Result<T, TatkhamError>;

impl TatkhamError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TatkhamError::Config(msg.into())
    }

    /// Create a new dictionary error.
    pub fn dictionary<S: Into<String>>(msg: S) -> Self {
        TatkhamError::Dictionary(msg.into())
    }

    /// Create a new engines-exhausted error.
    pub fn engines_exhausted<S: Into<String>>(msg: S) -> Self {
        TatkhamError::EnginesExhausted(msg.into())
    }

    /// Create a new variant-search error.
    pub fn variant_search<S: Into<String>>(msg: S) -> Self {
        TatkhamError::VariantSearch(msg.into())
    }

    /// Create a new backend-unreachable error.
    pub fn backend_unreachable<S: Into<String>>(msg: S) -> Self {
        TatkhamError::BackendUnreachable(msg.into())
    }

    /// Create a new invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TatkhamError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TatkhamError::Other(msg.into())
    }

    /// Stable machine-readable code for client-facing error responses.
    pub fn code(&self) -> &'static str {
        match self {
            TatkhamError::Io(_) => "io_error",
            TatkhamError::Json(_) => "invalid_json",
            TatkhamError::Config(_) => "invalid_config",
            TatkhamError::Dictionary(_) => "dictionary_error",
            TatkhamError::EnginesExhausted(_) => "segmentation_unavailable",
            TatkhamError::VariantSearch(_) => "variant_search_failed",
            TatkhamError::BackendUnreachable(_) => "backend_unreachable",
            TatkhamError::InvalidArgument(_) => "invalid_argument",
            TatkhamError::Other(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TatkhamError::dictionary("bad record");
        assert_eq!(error.to_string(), "Dictionary error: bad record");

        let error = TatkhamError::backend_unreachable("connect refused");
        assert_eq!(error.to_string(), "Backend unreachable: connect refused");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error = TatkhamError::from(io_error);

        match error {
            TatkhamError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_stable_codes() {
        assert_eq!(
            TatkhamError::backend_unreachable("x").code(),
            "backend_unreachable"
        );
        assert_eq!(
            TatkhamError::engines_exhausted("x").code(),
            "segmentation_unavailable"
        );
    }
}
