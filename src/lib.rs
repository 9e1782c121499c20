//! # Tatkham
//!
//! A segmentation-aware search proxy for Thai text.
//!
//! Thai is written without spaces between words, so substring search against
//! a stock full-text engine misses or under-ranks valid compound matches.
//! Tatkham sits between clients and the backend engine and compensates:
//!
//! - Segments queries with dictionary-driven maximal matching plus a chain
//!   of fallback engines
//! - Expands each query into weighted search variants (exact, component,
//!   partial)
//! - Executes the variants concurrently against the backend under one
//!   deadline
//! - Merges, deduplicates, and re-ranks the combined hits
//! - Caches ranked responses for a bounded TTL

pub mod cache;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod executor;
pub mod proxy;
pub mod ranking;
pub mod segment;
pub mod variant;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
