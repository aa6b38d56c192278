//! Bookshop Search: constrained book retrieval from free-text requests.
//!
//! Free text is turned into an include/exclude filter model by an external
//! extractor, compiled to a parameterised catalog query, sampled, relaxed and
//! retried on empty results, narrowed back to the original intent and logged
//! for offline analysis.

// Foundation
pub mod constants;
pub mod error;
pub mod id_gen;
pub mod time_utils;

// Core types
pub mod book;
pub mod config;
pub mod filter;
pub mod predicate;

// Sub-systems
pub mod storage;
pub mod query;
pub mod retrieval;
pub mod selection;
pub mod outcome_log;
pub mod extraction;
pub mod session;
pub mod pipeline;
pub mod network;
pub mod tracing_init;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-exports for convenience
pub use error::{ShopError, ShopResult};
