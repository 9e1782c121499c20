//! Query-variant generation.

pub mod generator;

pub use generator::{QueryVariant, VariantGenerator, VariantKind};
