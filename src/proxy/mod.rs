//! The proxy orchestrator and its HTTP surface.

pub mod handlers;
pub mod metrics;
pub mod orchestrator;
pub mod server;

pub use metrics::{MetricsSnapshot, ProxyMetrics};
pub use orchestrator::{HealthReport, QueryInfo, SearchOptions, SearchOutcome, SearchProxy};
pub use server::{router, serve};
