use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::storage::manager::StorageManager;
use bookshop_search::storage::outcomes::{OutcomeKind, OutcomeStorage};

/// `outcomes --limit N`: first N rows of each outcome table.
pub fn run(limit: usize) -> Result<()> {
    let config = ShopConfig::load();
    let conn = StorageManager::new(&config.storage)
        .open_telemetry_db()
        .context("Outcome log unavailable")?;

    for kind in [OutcomeKind::Success, OutcomeKind::Failure] {
        let total = OutcomeStorage::count(&conn, kind)?;
        println!("{} ({} total)", kind.table(), total);
        for record in OutcomeStorage::list(&conn, kind, limit)? {
            println!(
                "  #{} {}  {:?}\n      {}",
                record.id,
                record.date.format("%Y-%m-%d %H:%M:%S"),
                record.user_query,
                record.func_arguments
            );
        }
        println!();
    }
    Ok(())
}
