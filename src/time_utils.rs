use chrono::{DateTime, Utc};

/// Current UTC timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// ISO 8601 text for SQLite `TEXT` columns.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a timestamp previously written by [`to_sqlite`].
pub fn from_sqlite(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    s.parse::<DateTime<Utc>>()
}
