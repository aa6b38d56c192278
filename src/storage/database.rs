use crate::constants::SQLITE_BUSY_TIMEOUT_MS;
use crate::{ShopError, ShopResult};
use rusqlite::{Connection, OpenFlags};

/// Which side of the system a connection serves. Drives open flags and pragmas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Query path: read-only, the catalog file must already exist.
    CatalogReader,
    /// Import path: creates and rewrites the catalog.
    CatalogWriter,
    /// Outcome log: read-write, created on demand.
    Telemetry,
}

/// Open a SQLite connection configured for `role`.
///
/// A reader that cannot open its file reports `StoreUnavailable`; that is the
/// one failure the retrieval loop treats as fatal.
pub fn open_connection(path: &std::path::Path, role: ConnectionRole) -> ShopResult<Connection> {
    let conn = match role {
        ConnectionRole::CatalogReader => {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| {
                ShopError::StoreUnavailable(format!(
                    "Failed to open catalog {}: {}",
                    path.display(),
                    e
                ))
            })?
        }
        ConnectionRole::CatalogWriter | ConnectionRole::Telemetry => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path).map_err(|e| {
                ShopError::StoreUnavailable(format!("Failed to open {}: {}", path.display(), e))
            })?
        }
    };

    tracing::debug!(path = %path.display(), role = ?role, "Database connection opened");

    configure(&conn, role)?;
    Ok(conn)
}

/// Pragmas:
/// - busy_timeout = SQLITE_BUSY_TIMEOUT_MS (all roles)
/// - journal_mode = WAL, synchronous = NORMAL (telemetry)
/// - journal_mode = DELETE (catalog writer)
fn configure(conn: &Connection, role: ConnectionRole) -> ShopResult<()> {
    conn.busy_timeout(std::time::Duration::from_millis(SQLITE_BUSY_TIMEOUT_MS as u64))
        .map_err(|e| ShopError::Storage(format!("Failed to set busy timeout: {}", e)))?;

    let pragmas = match role {
        ConnectionRole::CatalogReader => return Ok(()),
        // Rollback journal: readers of a static catalog need no -shm file.
        ConnectionRole::CatalogWriter => "PRAGMA journal_mode = DELETE; PRAGMA temp_store = MEMORY;",
        ConnectionRole::Telemetry => {
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;"
        }
    };
    conn.execute_batch(pragmas)
        .map_err(|e| ShopError::Storage(format!("Failed to configure pragmas: {}", e)))?;
    Ok(())
}

/// Map a rusqlite failure on the query path: I/O, locking and corruption are
/// store faults, anything else is a plain storage error.
pub fn classify_query_error(e: rusqlite::Error) -> ShopError {
    use rusqlite::ErrorCode;
    match e.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied,
        ) => ShopError::StoreUnavailable(e.to_string()),
        _ => ShopError::Storage(e.to_string()),
    }
}
