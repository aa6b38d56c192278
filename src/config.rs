//! Configuration: one JSON file, one section per pipeline stage.
//!
//! Loaded from `{data_dir}/config.json`. Missing sections and fields take
//! their defaults; an unreadable file falls back to defaults with a warning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CANDIDATE_LIMIT, EXTRACTOR_TIMEOUT_SECS, MAX_ATTEMPTS, MAX_RECOMMENDATIONS,
    SUCCESS_SAMPLE_RATE, SUMMARY_WORDS,
};
use crate::storage::path_utils;

// ============================================================================
// STORAGE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Catalog database. Default: `{data_dir}/db/books.db`.
    pub catalog_path: Option<String>,
    /// Outcome log database. Default: `{data_dir}/db/agent_data.db`.
    pub telemetry_path: Option<String>,
}

impl StorageConfig {
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .as_deref()
            .map(|p| PathBuf::from(path_utils::expand_tilde(p)))
            .unwrap_or_else(path_utils::catalog_db_path)
    }

    pub fn telemetry_path(&self) -> PathBuf {
        self.telemetry_path
            .as_deref()
            .map(|p| PathBuf::from(path_utils::expand_tilde(p)))
            .unwrap_or_else(path_utils::telemetry_db_path)
    }
}

// ============================================================================
// RETRIEVAL
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Query attempts per request. Clamped to 1..=3.
    pub max_attempts: usize,
    /// Rows sampled per attempt. Clamped to 1..=10.
    pub candidate_limit: usize,
    /// Log every failed attempt to FAILURES, not only the terminal one.
    pub log_every_failed_attempt: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            candidate_limit: CANDIDATE_LIMIT,
            log_every_failed_attempt: false,
        }
    }
}

impl RetrievalConfig {
    pub fn effective_max_attempts(&self) -> usize {
        self.max_attempts.clamp(1, MAX_ATTEMPTS)
    }

    pub fn effective_candidate_limit(&self) -> usize {
        self.candidate_limit.clamp(1, CANDIDATE_LIMIT)
    }
}

// ============================================================================
// SELECTION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Clamped to at most 5.
    pub max_recommendations: usize,
    /// Word budget for rendered summaries.
    pub summary_words: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_recommendations: MAX_RECOMMENDATIONS,
            summary_words: SUMMARY_WORDS,
        }
    }
}

impl SelectionConfig {
    pub fn effective_max_recommendations(&self) -> usize {
        self.max_recommendations.min(MAX_RECOMMENDATIONS)
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Probability of recording a successful terminal attempt.
    pub success_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            success_sample_rate: SUCCESS_SAMPLE_RATE,
        }
    }
}

// ============================================================================
// EXTRACTOR (external NLU endpoint)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// POST endpoint returning a filter-model JSON object.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: EXTRACTOR_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// SERVER (out-of-process query service)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Local socket path. Default: `{data_dir}/query.sock`.
    pub socket_path: Option<String>,
}

impl ServerConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .as_deref()
            .map(|p| PathBuf::from(path_utils::expand_tilde(p)))
            .unwrap_or_else(path_utils::socket_path)
    }
}

// ============================================================================
// ROOT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub selection: SelectionConfig,
    pub telemetry: TelemetryConfig,
    pub extractor: ExtractorConfig,
    pub server: ServerConfig,
}

impl ShopConfig {
    /// Load from `{data_dir}/config.json`.
    pub fn load() -> Self {
        Self::load_from(&path_utils::config_path())
    }

    /// Load from an explicit path. Returns defaults if missing or invalid.
    pub fn load_from(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Invalid config, using defaults"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save to `{data_dir}/config.json`.
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&path_utils::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), String> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(config_path, json)
            .map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }
}
