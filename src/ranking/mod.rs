//! Merging and re-ranking of multi-variant search hits.

pub mod merger;

pub use merger::{MergePolicy, MergedResults, RankedResult, merge};
