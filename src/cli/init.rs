use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::storage::manager::StorageManager;
use bookshop_search::storage::path_utils;

/// `init`: data layout, telemetry schema, default config.
pub fn run() -> Result<()> {
    let config = ShopConfig::load();
    let storage = StorageManager::new(&config.storage);
    storage.init().context("Failed to initialize data directory")?;

    println!("Data directory: {}", path_utils::data_dir().display());
    println!("Config:         {}", path_utils::config_path().display());
    println!("Catalog:        {}", config.storage.catalog_path().display());
    println!("Outcome log:    {}", storage.telemetry_path().display());
    if !config.storage.catalog_path().exists() {
        println!("\nNo catalog yet. Load one with `bookshop-search import <books.jsonl>`.");
    }
    Ok(())
}
