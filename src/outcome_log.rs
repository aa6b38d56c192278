//! Outcome logger: sampled successes, every exhaustion.
//!
//! Best effort. Nothing in here returns an error to the caller; a failed write
//! is reported through `tracing::warn!` and the request carries on.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::config::TelemetryConfig;
use crate::constants::SUCCESS_SAMPLE_RATE;
use crate::filter::FilterModel;
use crate::retrieval::RetrievalOutcome;
use crate::storage::database::{self, ConnectionRole};
use crate::storage::migrations;
use crate::storage::outcomes::{OutcomeKind, OutcomeStorage};
use crate::time_utils;
use crate::ShopResult;

/// Source of uniform draws in `[0, 1)`.
pub trait DrawSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDraws;

impl DrawSource for RandomDraws {
    fn draw(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Maps a unit-interval draw to keep / drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    rate: f64,
}

impl SamplingPolicy {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn accept(&self, draw: f64) -> bool {
        draw < self.rate
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::new(SUCCESS_SAMPLE_RATE)
    }
}

/// Rows written for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogReport {
    pub successes: usize,
    pub failures: usize,
}

pub struct OutcomeLogger {
    conn: Option<Mutex<Connection>>,
    sampling: SamplingPolicy,
    draws: Box<dyn DrawSource>,
    log_every_failed_attempt: bool,
}

impl OutcomeLogger {
    /// Logger that never writes.
    pub fn disabled() -> Self {
        Self {
            conn: None,
            sampling: SamplingPolicy::default(),
            draws: Box::new(RandomDraws),
            log_every_failed_attempt: false,
        }
    }

    /// Wrap an open connection, creating the schema if needed.
    pub fn from_connection(conn: Connection, sampling: SamplingPolicy) -> ShopResult<Self> {
        migrations::migrate_telemetry_db(&conn)?;
        Ok(Self {
            conn: Some(Mutex::new(conn)),
            sampling,
            draws: Box::new(RandomDraws),
            log_every_failed_attempt: false,
        })
    }

    /// Open the telemetry database. A database that cannot be opened yields a
    /// disabled logger rather than an error.
    pub fn open(path: &Path, config: &TelemetryConfig) -> Self {
        if !config.enabled {
            tracing::info!("Outcome logging disabled by config");
            return Self::disabled();
        }
        let sampling = SamplingPolicy::new(config.success_sample_rate);
        let opened = database::open_connection(path, ConnectionRole::Telemetry)
            .and_then(|conn| Self::from_connection(conn, sampling));
        match opened {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Outcome log unavailable: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn with_draws(mut self, draws: Box<dyn DrawSource>) -> Self {
        self.draws = draws;
        self
    }

    /// Also record non-terminal failed attempts.
    pub fn log_every_failed_attempt(mut self, enabled: bool) -> Self {
        self.log_every_failed_attempt = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Record the outcome of one retrieval.
    ///
    /// - success: one SUCCESSES row with probability `rate`
    /// - exhausted: one FAILURES row for the terminal attempt
    ///
    /// With `log_every_failed_attempt`, every failed attempt gets its own
    /// FAILURES row instead, whatever the terminal state.
    pub fn record(&self, request_id: &str, user_text: &str, retrieval: &RetrievalOutcome) -> LogReport {
        let mut report = LogReport::default();
        if self.conn.is_none() {
            return report;
        }

        if self.log_every_failed_attempt {
            for attempt in retrieval.failed_attempts() {
                if self.append(request_id, OutcomeKind::Failure, user_text, &attempt.filters) {
                    report.failures += 1;
                }
            }
        } else if !retrieval.is_success() {
            if let Some(last) = retrieval.final_attempt() {
                if self.append(request_id, OutcomeKind::Failure, user_text, &last.filters) {
                    report.failures += 1;
                }
            }
        }

        if retrieval.is_success() {
            let draw = self.draws.draw();
            if self.sampling.accept(draw) {
                if let Some(last) = retrieval.final_attempt() {
                    if self.append(request_id, OutcomeKind::Success, user_text, &last.filters) {
                        report.successes += 1;
                    }
                }
            } else {
                tracing::debug!(request_id, draw, "Success not sampled");
            }
        }
        report
    }

    fn append(&self, request_id: &str, kind: OutcomeKind, user_text: &str, filters: &FilterModel) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };
        let func_arguments = match filters.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(request_id, "Outcome not logged, filter serialization failed: {}", e);
                return false;
            }
        };
        let mut guard = match conn.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(request_id, "Outcome not logged, telemetry connection poisoned");
                return false;
            }
        };
        match OutcomeStorage::append(&mut guard, kind, &time_utils::now(), user_text, &func_arguments) {
            Ok(id) => {
                tracing::info!(request_id, table = kind.table(), id, "Outcome logged");
                true
            }
            Err(e) => {
                tracing::warn!(request_id, table = kind.table(), "Outcome not logged: {}", e);
                false
            }
        }
    }

    /// Run `f` against the underlying connection (inspection and tests).
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> Option<T> {
        let conn = self.conn.as_ref()?;
        let guard = conn.lock().ok()?;
        Some(f(&guard))
    }
}
