//! Catalog store: the read-only `BOOKS` relation.
//!
//! The query path opens a fresh read-only connection per call, so concurrent
//! requests share nothing but the file. Population happens out-of-band
//! through [`CatalogStore::import_jsonl`].

use std::io::BufRead;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};
use serde::Deserialize;

use super::database::{self, classify_query_error, ConnectionRole};
use super::migrations;
use crate::book::CatalogEntry;
use crate::predicate::CompiledPredicate;
use crate::{ShopError, ShopResult};

#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

/// One line of an import file. Every field is optional so that incomplete
/// rows can be counted and dropped instead of failing the whole import.
#[derive(Debug, Deserialize)]
pub struct BookRecord {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub publisher: Option<String>,
    pub price: Option<f64>,
    pub publish_year: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub dropped: usize,
}

fn entry_from_row(row: &Row) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        index: row.get("index")?,
        title: row.get("TITLE")?,
        authors: row.get("AUTHORS")?,
        description: row.get("DESCRIPTION")?,
        category: row.get("CATEGORY")?,
        publisher: row.get("PUBLISHER")?,
        price: row.get("PRICE")?,
        publish_year: row.get("PUBLISH_YEAR")?,
    })
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> ShopResult<Connection> {
        database::open_connection(&self.path, ConnectionRole::CatalogReader)
    }

    /// Rows matching `predicate`, uniformly shuffled, capped at `limit`.
    pub fn sample(&self, predicate: &CompiledPredicate, limit: usize) -> ShopResult<Vec<CatalogEntry>> {
        let conn = self.reader()?;
        let cond = predicate.where_clause();
        let sql = format!(
            "SELECT * FROM BOOKS {} ORDER BY RANDOM() LIMIT {}",
            cond.sql, limit
        );
        tracing::debug!(sql = %sql, params = cond.params.len(), "Catalog query");

        let mut stmt = conn.prepare(&sql).map_err(classify_query_error)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(cond.params.iter()), entry_from_row)
            .map_err(classify_query_error)?;

        let mut books = Vec::new();
        for row in rows {
            books.push(row.map_err(classify_query_error)?);
        }
        Ok(books)
    }

    pub fn count(&self) -> ShopResult<usize> {
        let conn = self.reader()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM BOOKS", [], |r| r.get(0))
            .map_err(classify_query_error)?;
        Ok(n as usize)
    }

    /// Rebuild the catalog from JSON Lines. Incomplete rows are dropped, a
    /// leading "By " on authors is stripped and rows are indexed from 0 in
    /// file order.
    ///
    /// The new catalog is built in a sibling `.importing` file and renamed
    /// over the old one only after it commits, so a failed import leaves the
    /// existing catalog untouched.
    pub fn import_jsonl(&self, reader: impl BufRead) -> ShopResult<ImportReport> {
        let staging = self.sibling(".importing");
        remove_if_exists(&staging)?;

        let report = match build_catalog(&staging, reader) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Catalog import failed, keeping existing catalog: {}", e);
                let _ = std::fs::remove_file(&staging);
                return Err(e);
            }
        };

        for suffix in ["-wal", "-shm"] {
            remove_if_exists(&self.sibling(suffix))?;
        }
        std::fs::rename(&staging, &self.path)?;

        tracing::info!(
            imported = report.imported,
            dropped = report.dropped,
            path = %self.path.display(),
            "Catalog imported"
        );
        Ok(report)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.path.display(), suffix))
    }
}

fn remove_if_exists(path: &Path) -> ShopResult<()> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "Removing stale catalog file");
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Write every complete record into a fresh database at `path`.
fn build_catalog(path: &Path, reader: impl BufRead) -> ShopResult<ImportReport> {
    let mut conn = database::open_connection(path, ConnectionRole::CatalogWriter)?;
    migrations::migrate_catalog_db(&conn)?;

    let mut report = ImportReport::default();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO BOOKS (\"index\", TITLE, AUTHORS, DESCRIPTION, CATEGORY, PUBLISHER, PRICE, PUBLISH_YEAR)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: BookRecord = serde_json::from_str(&line).map_err(|e| {
                ShopError::InvalidInput(format!("Line {}: {}", line_no + 1, e))
            })?;

            let Some(book) = record.into_entry(report.imported as i64) else {
                report.dropped += 1;
                continue;
            };
            stmt.execute(params![
                book.index,
                book.title,
                book.authors,
                book.description,
                book.category,
                book.publisher,
                book.price,
                book.publish_year,
            ])?;
            report.imported += 1;
        }
    }
    tx.commit()?;
    Ok(report)
}

impl BookRecord {
    fn into_entry(self, index: i64) -> Option<CatalogEntry> {
        let authors = self.authors?;
        let authors = authors.strip_prefix("By ").unwrap_or(&authors).to_string();
        Some(CatalogEntry {
            index,
            title: self.title?,
            authors,
            description: self.description?,
            category: self.category?,
            publisher: self.publisher?,
            price: self.price?,
            publish_year: self.publish_year?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CANDIDATE_LIMIT;
    use crate::filter::{FilterDimension, FilterModel};
    use crate::predicate::{compile, contains_ci};
    use crate::test_helpers::{sample_catalog, seeded_store};

    #[test]
    fn test_unconstrained_returns_capped_sample() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let books = store
            .sample(&compile(&FilterModel::default()), CANDIDATE_LIMIT)
            .unwrap();
        assert_eq!(books.len(), CANDIDATE_LIMIT.min(sample_catalog().len()));
    }

    #[test]
    fn test_sample_never_exceeds_limit() {
        let many: Vec<_> = (0..40)
            .map(|i| {
                crate::test_helpers::BookBuilder::new()
                    .index(i)
                    .title(&format!("Volume {}", i))
                    .build()
            })
            .collect();
        let (_dir, store) = seeded_store(&many);
        for limit in [1, 5, 10] {
            let books = store.sample(&compile(&FilterModel::default()), limit).unwrap();
            assert_eq!(books.len(), limit);
        }
    }

    #[test]
    fn test_included_author_sql_agrees_with_memory() {
        let catalog = sample_catalog();
        let (_dir, store) = seeded_store(&catalog);
        let f = FilterModel::default().with(FilterDimension::IncludedAuthors, &["Stanley"]);
        let compiled = compile(&f);
        let books = store.sample(&compiled, 100).unwrap();
        assert!(!books.is_empty());
        for b in &books {
            assert!(contains_ci(&b.authors, "stanley"), "{}", b.authors);
        }
        let expected = catalog.iter().filter(|b| compiled.matches(b)).count();
        assert_eq!(books.len(), expected);
    }

    #[test]
    fn test_excluded_and_included_categories() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let f = FilterModel::default()
            .with(FilterDimension::ExcludedCategories, &["politics"])
            .with(FilterDimension::IncludedCategories, &["biography", "memoir"]);
        let books = store.sample(&compile(&f), 100).unwrap();
        assert!(!books.is_empty());
        for b in &books {
            let c = b.category.to_lowercase();
            assert!(c.contains("biography") || c.contains("memoir"));
            assert!(!c.contains("politics"));
        }
    }

    #[test]
    fn test_injection_attempt_is_just_a_value() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let f = FilterModel::default().with(
            FilterDimension::IncludedAuthors,
            &["x') OR 1=1; DROP TABLE BOOKS; --"],
        );
        let books = store.sample(&compile(&f), 100).unwrap();
        assert!(books.is_empty());
        assert_eq!(store.count().unwrap(), sample_catalog().len());
    }

    #[test]
    fn test_zero_matches_is_empty_not_error() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let f = FilterModel::default().with(FilterDimension::IncludedAuthors, &["Nobody Atall"]);
        assert!(store.sample(&compile(&f), 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_catalog_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("absent.db"));
        let err = store.sample(&compile(&FilterModel::default()), 10).unwrap_err();
        assert!(err.is_store_fault());
    }

    #[test]
    fn test_import_jsonl_drops_incomplete_and_strips_by() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("books.db"));
        let data = r#"{"title":"A","authors":"By Jane Roe","description":"d","category":"Fiction","publisher":"P","price":9.5,"publish_year":2001}
{"title":"B","authors":null,"description":"d","category":"Fiction","publisher":"P","price":1.0,"publish_year":1999}

{"title":"C","authors":"John Doe","description":"d","category":"History","publisher":"Q","price":3.0,"publish_year":2010}
"#;
        let report = store.import_jsonl(data.as_bytes()).unwrap();
        assert_eq!(report, ImportReport { imported: 2, dropped: 1 });
        assert_eq!(store.count().unwrap(), 2);

        let books = store.sample(&compile(&FilterModel::default()), 10).unwrap();
        let jane = books.iter().find(|b| b.title == "A").unwrap();
        assert_eq!(jane.authors, "Jane Roe");
        assert_eq!(jane.index, 0);
        let john = books.iter().find(|b| b.title == "C").unwrap();
        assert_eq!(john.index, 1);
    }

    #[test]
    fn test_import_replaces_existing_catalog() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let data = r#"{"title":"Only","authors":"X","description":"d","category":"c","publisher":"p","price":1.0,"publish_year":2000}"#;
        store.import_jsonl(data.as_bytes()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("books.db"));
        let err = store.import_jsonl("not json\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ShopError::InvalidInput(_)));
    }

    #[test]
    fn test_failed_import_keeps_existing_catalog() {
        let (dir, store) = seeded_store(&sample_catalog());
        let data = r#"{"title":"Only","authors":"X","description":"d","category":"c","publisher":"p","price":1.0,"publish_year":2000}
not json
"#;
        let err = store.import_jsonl(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ShopError::InvalidInput(_)));
        assert_eq!(store.count().unwrap(), sample_catalog().len());
        assert!(!dir.path().join("books.db.importing").exists());
    }

    fn tricky_catalog() -> Vec<CatalogEntry> {
        use crate::test_helpers::BookBuilder;
        let mut books = sample_catalog();
        let extra = [
            ("100% Cotton", "A history of fabric"),
            ("1000 Nights", "Tales told 100 times over"),
            ("a_b testing", "Experiments for product teams"),
            ("aXb notes", "Underscore lookalike"),
            ("Back\\slash", "Escaping in shells"),
            ("", ""),
        ];
        for (i, (title, description)) in extra.iter().enumerate() {
            books.push(
                BookBuilder::new()
                    .index(100 + i as i64)
                    .title(title)
                    .description(description)
                    .build(),
            );
        }
        books
    }

    #[test]
    fn test_keyword_filters_sql_agrees_with_memory() {
        let catalog = tricky_catalog();
        let (_dir, store) = seeded_store(&catalog);

        let cases: Vec<FilterModel> = vec![
            FilterModel::default().with(FilterDimension::IncludedKeywords, &["mars"]),
            FilterModel::default().with(FilterDimension::IncludedKeywords, &["dragon", "MEMOIR"]),
            FilterModel::default().with(FilterDimension::ExcludedKeywords, &["love", "war"]),
            FilterModel::default()
                .with(FilterDimension::IncludedKeywords, &["history"])
                .with(FilterDimension::ExcludedKeywords, &["fabric"]),
            FilterModel::default().with(FilterDimension::IncludedKeywords, &["100%"]),
            FilterModel::default().with(FilterDimension::IncludedKeywords, &["a_b"]),
            FilterModel::default().with(FilterDimension::IncludedKeywords, &["\\"]),
            FilterModel::default().with(FilterDimension::ExcludedKeywords, &["100%", "a_b", "\\"]),
            FilterModel::default()
                .with(FilterDimension::IncludedAuthors, &["anonymous"])
                .with(FilterDimension::ExcludedKeywords, &["x"]),
        ];

        for f in &cases {
            let compiled = compile(f);
            let mut from_sql: Vec<i64> = store.sample(&compiled, 1000).unwrap().iter().map(|b| b.index).collect();
            from_sql.sort_unstable();
            let expected: Vec<i64> = catalog.iter().filter(|b| compiled.matches(b)).map(|b| b.index).collect();
            assert_eq!(from_sql, expected, "filters: {:?}", f);
        }

        // Wildcards in tokens match literally.
        let pct = store
            .sample(&compile(&cases[4]), 1000)
            .unwrap();
        assert_eq!(pct.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(), vec!["100% Cotton"]);
        let underscore = store.sample(&compile(&cases[5]), 1000).unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].title, "a_b testing");
    }

    #[test]
    fn test_repeated_queries_sample_different_rows() {
        let many: Vec<_> = (0..200)
            .map(|i| {
                crate::test_helpers::BookBuilder::new()
                    .index(i)
                    .title(&format!("Volume {}", i))
                    .build()
            })
            .collect();
        let (_dir, store) = seeded_store(&many);
        let compiled = compile(&FilterModel::default());

        let samples: Vec<Vec<i64>> = (0..5)
            .map(|_| store.sample(&compiled, 10).unwrap().iter().map(|b| b.index).collect())
            .collect();
        assert!(samples.iter().all(|s| s.len() == 10));
        assert!(samples.windows(2).any(|w| w[0] != w[1]), "five identical samples: {:?}", samples);
    }
}
