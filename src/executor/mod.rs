//! Concurrent multi-variant search execution against the backend engine.

pub mod backend;
pub mod executor;

pub use backend::{BackendHit, BackendResponse, HttpBackend, SearchBackend};
pub use executor::{ExecutionReport, SearchExecutor, SearchHit, VariantState, VariantStatus};
