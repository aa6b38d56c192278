// === Filter Model ===
pub const MAX_FILTER_TOKENS: usize = 10;

// === Query ===
pub const CANDIDATE_LIMIT: usize = 10;
pub const NO_MATCHES_MESSAGE: &str = "No books found that match given criteria";

// === Retrieval ===
pub const MAX_ATTEMPTS: usize = 3;

// === Selection ===
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const SUMMARY_WORDS: usize = 30;

// === Telemetry ===
pub const SUCCESS_SAMPLE_RATE: f64 = 0.10;

// === SQLite Tuning ===
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;

// === Transport ===
pub const IPC_TIMEOUT_SECS: u64 = 30;
pub const EXTRACTOR_TIMEOUT_SECS: u64 = 30;

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
