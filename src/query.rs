//! Catalog query service: one filter model in, one bounded sample out.
//!
//! `BookQueryService` is the seam the retrieval loop talks to. The local
//! implementation runs against the SQLite catalog; the network client in
//! `network::client` implements the same trait over a local socket.

use serde::{Deserialize, Serialize};

use crate::book::CatalogEntry;
use crate::constants::{CANDIDATE_LIMIT, NO_MATCHES_MESSAGE};
use crate::filter::FilterModel;
use crate::predicate;
use crate::storage::catalog::CatalogStore;
use crate::ShopResult;

/// Result of one query attempt. Zero matches is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryOutcome {
    Success { books: Vec<CatalogEntry> },
    Error { error_message: String },
}

impl QueryOutcome {
    pub fn no_matches() -> Self {
        Self::Error {
            error_message: NO_MATCHES_MESSAGE.to_string(),
        }
    }

    /// Empty sample becomes the no-matches variant.
    pub fn from_books(books: Vec<CatalogEntry>) -> Self {
        if books.is_empty() {
            Self::no_matches()
        } else {
            Self::Success { books }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn books(&self) -> &[CatalogEntry] {
        match self {
            Self::Success { books } => books,
            Self::Error { .. } => &[],
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

pub trait BookQueryService: Send + Sync {
    /// Execute one filter model. `Err` is reserved for faults
    /// (validation, store unavailable); no matches is `Ok(QueryOutcome::Error)`.
    fn query(&self, filters: &FilterModel) -> ShopResult<QueryOutcome>;
}

/// In-process executor over the catalog database.
#[derive(Debug, Clone)]
pub struct CatalogExecutor {
    store: CatalogStore,
    limit: usize,
}

impl CatalogExecutor {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store,
            limit: CANDIDATE_LIMIT,
        }
    }

    /// Sample size per attempt, never above the candidate cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, CANDIDATE_LIMIT);
        self
    }
}

impl BookQueryService for CatalogExecutor {
    fn query(&self, filters: &FilterModel) -> ShopResult<QueryOutcome> {
        filters.validate()?;
        let compiled = predicate::compile(filters);
        let books = self.store.sample(&compiled, self.limit)?;
        tracing::debug!(
            constrained = compiled.constrained,
            candidates = books.len(),
            "Catalog executor finished"
        );
        Ok(QueryOutcome::from_books(books))
    }
}
