use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::time_utils;
use crate::{ShopError, ShopResult};

/// Which append-only log a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl OutcomeKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESSES",
            Self::Failure => "FAILURES",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub user_query: String,
    /// Serialized filter model used by the logged attempt.
    pub func_arguments: String,
}

pub struct OutcomeStorage;

fn record_from_row(row: &Row) -> rusqlite::Result<OutcomeRecord> {
    let date_str: String = row.get("DATE")?;
    let date = time_utils::from_sqlite(&date_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(OutcomeRecord {
        id: row.get("ID")?,
        date,
        user_query: row.get("USER_QUERY")?,
        func_arguments: row.get("FUNC_ARGUMENTS")?,
    })
}

impl OutcomeStorage {
    /// Append one record in its own transaction. Returns the new row id.
    pub fn append(
        conn: &mut Connection,
        kind: OutcomeKind,
        date: &DateTime<Utc>,
        user_query: &str,
        func_arguments: &str,
    ) -> ShopResult<i64> {
        let tx = conn
            .transaction()
            .map_err(|e| ShopError::Storage(format!("Begin outcome write failed: {}", e)))?;
        tx.execute(
            &format!(
                "INSERT INTO {} (DATE, USER_QUERY, FUNC_ARGUMENTS) VALUES (?1, ?2, ?3)",
                kind.table()
            ),
            params![time_utils::to_sqlite(date), user_query, func_arguments],
        )
        .map_err(|e| ShopError::Storage(format!("Insert outcome failed: {}", e)))?;
        let id = tx.last_insert_rowid();
        tx.commit()
            .map_err(|e| ShopError::Storage(format!("Commit outcome failed: {}", e)))?;
        tracing::debug!(table = kind.table(), id, "Outcome appended");
        Ok(id)
    }

    /// Oldest-first listing, capped at `limit`.
    pub fn list(conn: &Connection, kind: OutcomeKind, limit: usize) -> ShopResult<Vec<OutcomeRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT * FROM {} ORDER BY ID ASC LIMIT ?1",
                kind.table()
            ))
            .map_err(|e| ShopError::Storage(e.to_string()))?;
        let records = stmt
            .query_map(params![limit as i64], record_from_row)
            .map_err(|e| ShopError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ShopError::Storage(format!("Unreadable {} row: {}", kind.table(), e)))?;
        Ok(records)
    }

    pub fn count(conn: &Connection, kind: OutcomeKind) -> ShopResult<usize> {
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |r| r.get(0))
            .map_err(|e| ShopError::Storage(e.to_string()))?;
        Ok(n as usize)
    }
}
