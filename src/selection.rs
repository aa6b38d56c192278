//! Selection stage and response rendering.
//!
//! Retrieval may loosen filters to find anything at all; selection puts the
//! user's original criteria back. Candidates are checked against the
//! unrelaxed filter model and the first qualifying ones are kept, in
//! candidate order.

use serde::Serialize;

use crate::book::CatalogEntry;
use crate::constants::{MAX_RECOMMENDATIONS, SUMMARY_WORDS};
use crate::filter::FilterModel;
use crate::predicate;
use crate::retrieval::RetrievalOutcome;

pub const SUCCESS_HEADER: &str = "The search was successful. Here are the books I recommend:";
pub const UNSUCCESSFUL_MESSAGE: &str =
    "Unfortunately, the search was unsuccessful. Is there anything else I can help you with?";
pub const NO_RESULTS_MESSAGE: &str = "Unfortunately, the search was unsuccessful: no books in the catalog match these criteria. Is there anything else I can help you with?";

/// What the user gets back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// 1..=5 entries consistent with the original request.
    Recommended { books: Vec<CatalogEntry> },
    /// Retrieval found candidates but none satisfy the original request.
    NoSuitableMatch,
    /// Retrieval exhausted its attempts without a single candidate.
    NoResults,
}

impl Recommendation {
    pub fn books(&self) -> &[CatalogEntry] {
        match self {
            Self::Recommended { books } => books,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionStage {
    max_recommendations: usize,
    summary_words: usize,
}

impl Default for SelectionStage {
    fn default() -> Self {
        Self {
            max_recommendations: MAX_RECOMMENDATIONS,
            summary_words: SUMMARY_WORDS,
        }
    }
}

impl SelectionStage {
    pub fn new(max_recommendations: usize, summary_words: usize) -> Self {
        Self {
            max_recommendations: max_recommendations.min(MAX_RECOMMENDATIONS),
            summary_words,
        }
    }

    /// Candidates that satisfy `original`, first `max_recommendations` kept.
    pub fn select(&self, candidates: &[CatalogEntry], original: &FilterModel) -> Vec<CatalogEntry> {
        let compiled = predicate::compile(original);
        candidates
            .iter()
            .filter(|b| compiled.matches(b))
            .take(self.max_recommendations)
            .cloned()
            .collect()
    }

    pub fn recommend(&self, retrieval: &RetrievalOutcome) -> Recommendation {
        if !retrieval.is_success() {
            return Recommendation::NoResults;
        }
        let books = self.select(retrieval.candidates(), &retrieval.original);
        tracing::info!(
            candidates = retrieval.candidates().len(),
            selected = books.len(),
            "Selection finished"
        );
        if books.is_empty() {
            Recommendation::NoSuitableMatch
        } else {
            Recommendation::Recommended { books }
        }
    }

    pub fn render(&self, recommendation: &Recommendation) -> String {
        match recommendation {
            Recommendation::Recommended { books } => {
                let blocks: Vec<String> = books.iter().map(|b| self.render_book(b)).collect();
                format!("{}\n{}", SUCCESS_HEADER, blocks.join("\n\n"))
            }
            Recommendation::NoSuitableMatch => UNSUCCESSFUL_MESSAGE.to_string(),
            Recommendation::NoResults => NO_RESULTS_MESSAGE.to_string(),
        }
    }

    fn render_book(&self, book: &CatalogEntry) -> String {
        format!(
            "Title: {}\nAuthors: {}\nCategory: {}\nSummary: {}\nPublisher: {}\nPrice: {:.2}\nPublication Year: {}",
            book.title,
            book.authors,
            book.category,
            book.summary(self.summary_words),
            book.publisher,
            book.price,
            book.publish_year,
        )
    }
}
