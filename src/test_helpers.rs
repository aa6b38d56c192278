//! Shared test utilities: book builder, seeded catalogs, scripted collaborators.
//!
//! Available only under `#[cfg(test)]`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::book::CatalogEntry;
use crate::constants::CANDIDATE_LIMIT;
use crate::extraction::FilterExtractor;
use crate::filter::FilterModel;
use crate::outcome_log::DrawSource;
use crate::predicate;
use crate::query::{BookQueryService, QueryOutcome};
use crate::storage::catalog::CatalogStore;
use crate::storage::database::{self, ConnectionRole};
use crate::storage::migrations;
use crate::{ShopError, ShopResult};

// ============================================================================
// BookBuilder
// ============================================================================

static NEXT_INDEX: AtomicI64 = AtomicI64::new(1_000);

pub struct BookBuilder {
    book: CatalogEntry,
}

impl BookBuilder {
    /// Every builder gets a fresh index so seeded stores never collide.
    pub fn new() -> Self {
        Self {
            book: CatalogEntry {
                index: NEXT_INDEX.fetch_add(1, Ordering::Relaxed),
                title: "Untitled".to_string(),
                authors: "Anonymous".to_string(),
                description: "No description available".to_string(),
                category: "General".to_string(),
                publisher: "Test Press".to_string(),
                price: 10.0,
                publish_year: 2000,
            },
        }
    }

    pub fn index(mut self, i: i64) -> Self {
        self.book.index = i;
        self
    }

    pub fn title(mut self, t: &str) -> Self {
        self.book.title = t.to_string();
        self
    }

    pub fn authors(mut self, a: &str) -> Self {
        self.book.authors = a.to_string();
        self
    }

    pub fn description(mut self, d: &str) -> Self {
        self.book.description = d.to_string();
        self
    }

    pub fn category(mut self, c: &str) -> Self {
        self.book.category = c.to_string();
        self
    }

    pub fn publisher(mut self, p: &str) -> Self {
        self.book.publisher = p.to_string();
        self
    }

    pub fn price(mut self, p: f64) -> Self {
        self.book.price = p;
        self
    }

    pub fn year(mut self, y: i64) -> Self {
        self.book.publish_year = y;
        self
    }

    pub fn build(self) -> CatalogEntry {
        self.book
    }
}

// ============================================================================
// Catalog fixtures
// ============================================================================

/// Fourteen books: two Stanley authors, a few memoirs and biographies (one
/// of them political), history, politics, fiction. Indexes 0..14.
pub fn sample_catalog() -> Vec<CatalogEntry> {
    let rows: [(&str, &str, &str, &str); 14] = [
        ("Red Mars", "Kim Stanley Robinson", "Colonists terraform Mars over decades of struggle", "Fiction / Science Fiction"),
        ("Stanley Kubrick: A Life", "Vincent LoBrutto", "The life of the film director", "Biography & Autobiography"),
        ("The Shining Screenplay", "Stanley Kubrick, Diane Johnson", "Shooting script of the horror film", "Performing Arts"),
        ("The Hobbit", "J. R. R. Tolkien", "A hobbit goes on an adventure with dwarves and a dragon", "Fiction / Fantasy"),
        ("Becoming", "Michelle Obama", "A memoir by the former First Lady", "Biography & Autobiography / Memoir"),
        ("A Promised Land", "Barack Obama", "Presidential memoir of the first term", "Biography / Politics"),
        ("War and Peace", "Leo Tolstoy", "Love and war in Napoleonic Russia", "Fiction / Classics"),
        ("The Guns of August", "Barbara W. Tuchman", "The first month of the Great War", "History / Military"),
        ("On Tyranny", "Timothy Snyder", "Twenty lessons from the twentieth century", "Politics"),
        ("The Joy of Cooking", "Irma S. Rombauer", "Recipes for every kitchen", "Cooking"),
        ("Educated", "Tara Westover", "Growing up in a survivalist family in Idaho", "Memoir"),
        ("Pride and Prejudice", "Jane Austen", "Love and manners in Regency England", "Fiction / Romance"),
        ("Steve Jobs", "Walter Isaacson", "The Apple founder told through interviews", "Biography & Autobiography"),
        ("A Brief History of Time", "Stephen Hawking", "From the big bang to black holes", "Science"),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (title, authors, description, category))| {
            BookBuilder::new()
                .index(i as i64)
                .title(title)
                .authors(authors)
                .description(description)
                .category(category)
                .publisher("Sample House")
                .price(12.5 + i as f64)
                .year(1950 + i as i64 * 5)
                .build()
        })
        .collect()
}

/// Catalog database in a temp dir, holding exactly `books`.
pub fn seeded_store(books: &[CatalogEntry]) -> (TempDir, CatalogStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.db");
    {
        let mut conn = database::open_connection(&path, ConnectionRole::CatalogWriter).unwrap();
        migrations::migrate_catalog_db(&conn).unwrap();
        let tx = conn.transaction().unwrap();
        for b in books {
            tx.execute(
                "INSERT INTO BOOKS (\"index\", TITLE, AUTHORS, DESCRIPTION, CATEGORY, PUBLISHER, PRICE, PUBLISH_YEAR)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    b.index,
                    b.title,
                    b.authors,
                    b.description,
                    b.category,
                    b.publisher,
                    b.price,
                    b.publish_year
                ],
            )
            .unwrap();
        }
        tx.commit().unwrap();
    }
    (dir, CatalogStore::new(path))
}

// ============================================================================
// Query services
// ============================================================================

/// Pops one scripted result per call; no matches once the script runs out.
pub struct ScriptedQueryService {
    script: Mutex<VecDeque<ShopResult<QueryOutcome>>>,
    calls: Mutex<Vec<FilterModel>>,
}

impl ScriptedQueryService {
    pub fn new(script: Vec<ShopResult<QueryOutcome>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_empty() -> Self {
        Self::new(Vec::new())
    }

    /// Filter models received so far, in order.
    pub fn calls(&self) -> Vec<FilterModel> {
        self.calls.lock().unwrap().clone()
    }
}

impl BookQueryService for ScriptedQueryService {
    fn query(&self, filters: &FilterModel) -> ShopResult<QueryOutcome> {
        self.calls.lock().unwrap().push(filters.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutcome::no_matches()))
    }
}

/// In-memory catalog evaluated with the same predicate as SQL, in catalog
/// order (no shuffling), capped at the candidate limit.
pub struct MemoryCatalogService {
    books: Vec<CatalogEntry>,
}

impl MemoryCatalogService {
    pub fn new(books: Vec<CatalogEntry>) -> Self {
        Self { books }
    }
}

impl BookQueryService for MemoryCatalogService {
    fn query(&self, filters: &FilterModel) -> ShopResult<QueryOutcome> {
        filters.validate()?;
        let compiled = predicate::compile(filters);
        let books: Vec<CatalogEntry> = self
            .books
            .iter()
            .filter(|b| compiled.matches(b))
            .take(CANDIDATE_LIMIT)
            .cloned()
            .collect();
        Ok(QueryOutcome::from_books(books))
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Records the text it was given and returns an unconstrained model.
#[derive(Default)]
pub struct RecordingExtractor {
    texts: Mutex<Vec<String>>,
}

impl RecordingExtractor {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl FilterExtractor for RecordingExtractor {
    fn extract(&self, user_text: &str) -> ShopResult<FilterModel> {
        self.texts.lock().unwrap().push(user_text.to_string());
        Ok(FilterModel::default())
    }
}

pub struct FailingExtractor;

impl FilterExtractor for FailingExtractor {
    fn extract(&self, _user_text: &str) -> ShopResult<FilterModel> {
        Err(ShopError::Extraction("extractor offline".into()))
    }
}

// ============================================================================
// Draws
// ============================================================================

/// Replays a fixed sequence of draws, wrapping around at the end.
pub struct SequenceDraws {
    values: Vec<f64>,
    next: Mutex<usize>,
}

impl SequenceDraws {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty());
        Self {
            values,
            next: Mutex::new(0),
        }
    }
}

impl DrawSource for SequenceDraws {
    fn draw(&self) -> f64 {
        let mut next = self.next.lock().unwrap();
        let value = self.values[*next % self.values.len()];
        *next += 1;
        value
    }
}
