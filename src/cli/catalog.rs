use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::filter::FilterModel;
use bookshop_search::predicate;
use bookshop_search::storage::manager::StorageManager;

const PREVIEW_ROWS: usize = 5;

/// `catalog`: row count plus a random preview.
pub fn run() -> Result<()> {
    let config = ShopConfig::load();
    let store = StorageManager::new(&config.storage).catalog();

    let count = store.count().context("Catalog unavailable")?;
    println!("{} books in {}", count, store.path().display());

    let preview = store.sample(&predicate::compile(&FilterModel::default()), PREVIEW_ROWS)?;
    for book in preview {
        println!(
            "  [{}] {} by {} ({}, {}, {:.2})",
            book.index, book.title, book.authors, book.category, book.publish_year, book.price
        );
    }
    Ok(())
}
