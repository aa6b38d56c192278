//! Shared tracing initialization: every command appends to `bookshop.log`.
//!
//! The CLI and the query server write to the same file, so a request served
//! remotely shows up next to the pipeline that sent it.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::storage::path_utils;

/// File name under `{data_dir}/logs/`.
pub const LOG_FILE_NAME: &str = "bookshop.log";

fn open_log_file() -> Option<File> {
    let logs_dir = path_utils::logs_dir();
    std::fs::create_dir_all(&logs_dir).ok()?;
    // Append mode: short writes from concurrent processes stay whole.
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE_NAME))
        .ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize global tracing.
///
/// - file layer: `{data_dir}/logs/bookshop.log`, no ANSI, always on when the
///   file can be opened
/// - console layer: stderr, only when `console` is set
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(console: bool) {
    let file_layer = open_log_file().map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_target(true)
            .with_ansi(false)
            .with_filter(env_filter())
    });

    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(env_filter())
    });

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();
}
