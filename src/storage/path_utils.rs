use std::path::PathBuf;

/// Environment override for the data directory (tests, containers).
pub const DATA_DIR_ENV: &str = "BOOKSHOP_DATA_DIR";

/// Cross-platform data directory.
/// Linux: ~/.config/bookshop-search/
/// macOS: ~/Library/Application Support/bookshop-search/
/// Windows: %APPDATA%/bookshop-search/
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("bookshop-search")
}

/// {data_dir}/db/books.db
pub fn catalog_db_path() -> PathBuf {
    data_dir().join("db").join("books.db")
}

/// {data_dir}/db/agent_data.db
pub fn telemetry_db_path() -> PathBuf {
    data_dir().join("db").join("agent_data.db")
}

/// {data_dir}/logs/
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// {data_dir}/config.json
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// {data_dir}/sessions/
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}

/// {data_dir}/query.sock
pub fn socket_path() -> PathBuf {
    data_dir().join("query.sock")
}

/// Expand ~ to home directory in paths.
pub fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") || path == "~" {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
