use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::ShopResult;
use rusqlite::Connection;

use super::catalog::CatalogStore;
use super::database::{self, ConnectionRole};
use super::migrations;

/// Resolves and opens the two databases the system owns.
pub struct StorageManager {
    catalog_path: PathBuf,
    telemetry_path: PathBuf,
}

impl StorageManager {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            catalog_path: config.catalog_path(),
            telemetry_path: config.telemetry_path(),
        }
    }

    pub fn catalog(&self) -> CatalogStore {
        CatalogStore::new(self.catalog_path.clone())
    }

    pub fn telemetry_path(&self) -> &std::path::Path {
        &self.telemetry_path
    }

    /// Open the outcome log (created if necessary + schema check).
    pub fn open_telemetry_db(&self) -> ShopResult<Connection> {
        let conn = database::open_connection(&self.telemetry_path, ConnectionRole::Telemetry)?;
        migrations::migrate_telemetry_db(&conn)?;
        Ok(conn)
    }

    /// Create the data layout: db directory, telemetry schema, default config.
    pub fn init(&self) -> ShopResult<()> {
        if let Some(parent) = self.catalog_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _telemetry = self.open_telemetry_db()?;

        if !super::path_utils::config_path().exists() {
            if let Err(e) = crate::config::ShopConfig::default().save() {
                tracing::warn!("Default config not written: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::table_exists;

    #[test]
    fn test_open_telemetry_db_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            catalog_path: Some(dir.path().join("books.db").display().to_string()),
            telemetry_path: Some(dir.path().join("db").join("agent_data.db").display().to_string()),
        };
        let manager = StorageManager::new(&cfg);
        let conn = manager.open_telemetry_db().unwrap();
        assert!(table_exists(&conn, "SUCCESSES").unwrap());
        assert!(table_exists(&conn, "FAILURES").unwrap());
        drop(conn);
        // Second open is a no-op on the schema.
        assert!(manager.open_telemetry_db().is_ok());
    }
}
