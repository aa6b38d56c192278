use std::io::BufReader;

use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::storage::manager::StorageManager;

/// `import <file>`: rebuild the catalog from JSON Lines.
pub fn run(file: &str) -> Result<()> {
    let config = ShopConfig::load();
    let store = StorageManager::new(&config.storage).catalog();

    let source = std::fs::File::open(file).with_context(|| format!("Failed to open {}", file))?;
    let report = store
        .import_jsonl(BufReader::new(source))
        .with_context(|| format!("Import from {} failed", file))?;

    println!(
        "Imported {} books into {} ({} incomplete rows dropped)",
        report.imported,
        store.path().display(),
        report.dropped
    );
    Ok(())
}
