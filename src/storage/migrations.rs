use crate::{ShopError, ShopResult};
use rusqlite::Connection;

/// Outcome log tables. Both share one shape.
pub const OUTCOME_TABLES: [&str; 2] = ["SUCCESSES", "FAILURES"];

// ── Telemetry DB ──

const TELEMETRY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS SUCCESSES (
    ID INTEGER PRIMARY KEY NOT NULL,
    DATE TEXT NOT NULL,
    USER_QUERY TEXT NOT NULL,
    FUNC_ARGUMENTS TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS FAILURES (
    ID INTEGER PRIMARY KEY NOT NULL,
    DATE TEXT NOT NULL,
    USER_QUERY TEXT NOT NULL,
    FUNC_ARGUMENTS TEXT NOT NULL
);
";

// ── Catalog DB ──

const CATALOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS BOOKS (
    \"index\" INTEGER PRIMARY KEY NOT NULL,
    TITLE TEXT NOT NULL,
    AUTHORS TEXT NOT NULL,
    DESCRIPTION TEXT NOT NULL,
    CATEGORY TEXT NOT NULL,
    PUBLISHER TEXT NOT NULL,
    PRICE REAL NOT NULL,
    PUBLISH_YEAR INTEGER NOT NULL
);
";

/// True if `table` exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> ShopResult<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
        rusqlite::params![table],
        |r| r.get(0),
    )
    .map_err(|e| ShopError::Storage(e.to_string()))
}

/// Create the outcome tables if missing. Safe to call on every start.
/// Returns true when the schema was created by this call.
pub fn migrate_telemetry_db(conn: &Connection) -> ShopResult<bool> {
    let mut missing = false;
    for table in OUTCOME_TABLES {
        if !table_exists(conn, table)? {
            missing = true;
        }
    }
    if !missing {
        tracing::debug!("Telemetry schema present");
        return Ok(false);
    }

    conn.execute_batch(TELEMETRY_SCHEMA)
        .map_err(|e| ShopError::Storage(format!("Telemetry migration failed: {}", e)))?;
    tracing::info!("Telemetry schema created");
    Ok(true)
}

/// Create the `BOOKS` relation if missing.
pub fn migrate_catalog_db(conn: &Connection) -> ShopResult<()> {
    conn.execute_batch(CATALOG_SCHEMA)
        .map_err(|e| ShopError::Storage(format!("Catalog migration failed: {}", e)))?;
    Ok(())
}
