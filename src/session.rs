//! Session memory: dislikes stated earlier in a conversation.
//!
//! Persisted as `{data_dir}/sessions/<session_id>.json`. Only negative
//! signals are remembered and only those are ever added back to a request,
//! so a later query cannot inherit a positive preference the user did not
//! repeat.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::path_utils;
use crate::{ShopError, ShopResult};

pub const MAX_SESSION_DISLIKES: usize = 20;
const MAX_DISLIKE_CHARS: usize = 80;

/// Phrase openers and the text kept in front of the captured object.
const DISLIKE_PATTERNS: &[(&str, &str)] = &[
    ("i don't like ", ""),
    ("i do not like ", ""),
    ("i dislike ", ""),
    ("i hate ", ""),
    ("no more ", ""),
    ("no books by ", "books by "),
];

pub trait DislikeMemory: Send + Sync {
    /// Text for extraction: `user_text` plus dislikes remembered for the session.
    fn augment_with_dislikes(&self, session_id: &str, user_text: &str) -> ShopResult<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub dislikes: Vec<String>,
}

impl SessionRecord {
    pub fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            created_at: now,
            updated_at: now,
            dislikes: Vec::new(),
        }
    }

    /// Add a dislike (case-insensitive dedup, oldest dropped past the cap).
    pub fn add_dislike(&mut self, dislike: &str) -> bool {
        if self.dislikes.iter().any(|d| d.eq_ignore_ascii_case(dislike)) {
            return false;
        }
        self.dislikes.push(dislike.to_string());
        if self.dislikes.len() > MAX_SESSION_DISLIKES {
            self.dislikes.remove(0);
        }
        true
    }
}

/// Pull "I hate X" style statements out of a message.
pub fn detect_dislikes(message: &str) -> Vec<String> {
    // ASCII lowering keeps byte offsets valid in `message`.
    let lower = message.to_ascii_lowercase();
    let mut found: Vec<String> = Vec::new();

    for (pattern, keep) in DISLIKE_PATTERNS {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(pattern) {
            let at = from + pos;
            let start = at + pattern.len();
            // Phrase must start a word: "know more" is not "no more".
            if lower[..at].chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric()) {
                from = start;
                continue;
            }
            let rest = &message[start..];
            let end = rest
                .find(['.', '!', '?', ',', ';', '\n'])
                .unwrap_or(rest.len());
            let object = crate::constants::truncate_safe(rest[..end].trim(), MAX_DISLIKE_CHARS).trim();
            if object.len() >= 2 {
                let dislike = format!("{}{}", keep, object);
                if !found.iter().any(|d| d.eq_ignore_ascii_case(&dislike)) {
                    found.push(dislike);
                }
            }
            from = start;
        }
    }
    found
}

/// Append remembered dislikes that the text does not already mention.
pub fn augment_text(user_text: &str, dislikes: &[String]) -> String {
    let lower = user_text.to_ascii_lowercase();
    let missing: Vec<&str> = dislikes
        .iter()
        .filter(|d| !lower.contains(&d.to_ascii_lowercase()))
        .map(|d| d.as_str())
        .collect();
    if missing.is_empty() {
        user_text.to_string()
    } else {
        format!(
            "{}\nEarlier in this conversation I said I dislike: {}.",
            user_text,
            missing.join("; ")
        )
    }
}

/// File-backed dislike ledger, one JSON file per session.
#[derive(Debug, Clone)]
pub struct SessionLedger {
    dir: PathBuf,
}

impl SessionLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{data_dir}/sessions/`
    pub fn default_location() -> Self {
        Self::new(path_utils::sessions_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> ShopResult<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id.len() <= 64
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ShopError::InvalidInput(format!(
                "Invalid session id: {:?}",
                session_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }

    /// Load a session, or a fresh record if none exists yet.
    pub fn load(&self, session_id: &str) -> ShopResult<SessionRecord> {
        let path = self.path_for(session_id)?;
        if !path.exists() {
            return Ok(SessionRecord::new(session_id));
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Corrupt session file, starting over");
                Ok(SessionRecord::new(session_id))
            }
        }
    }

    pub fn save(&self, record: &SessionRecord) -> ShopResult<()> {
        let path = self.path_for(&record.session_id)?;
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Delete a session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> ShopResult<bool> {
        let path = self.path_for(session_id)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl DislikeMemory for SessionLedger {
    fn augment_with_dislikes(&self, session_id: &str, user_text: &str) -> ShopResult<String> {
        let mut record = self.load(session_id)?;
        let remembered = record.dislikes.clone();

        let mut changed = false;
        for dislike in detect_dislikes(user_text) {
            changed |= record.add_dislike(&dislike);
        }
        if changed {
            record.updated_at = Utc::now();
            self.save(&record)?;
            tracing::info!(session_id, dislikes = record.dislikes.len(), "Session dislikes updated");
        }

        Ok(augment_text(user_text, &remembered))
    }
}
