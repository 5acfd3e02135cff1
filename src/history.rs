//! In-memory joke history with whole-file JSON persistence.
//!
//! The history file is a single JSON array of records, fully overwritten on
//! every save and loaded wholesale on start.

use std::fs;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};

/// One generated joke plus its metadata. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub text: String,
    pub category: String,
    #[serde(rename = "timestamp")]
    pub created_at: String,
    #[serde(rename = "id")]
    pub sequence_id: u64,
}

impl ContentRecord {
    pub fn new(text: impl Into<String>, category: impl Into<String>, sequence_id: u64) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            created_at: now_timestamp(),
            sequence_id,
        }
    }

    /// First `max_chars` characters followed by an ellipsis.
    pub fn preview(&self, max_chars: usize) -> String {
        let head: String = self.text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct HistoryStore {
    records: Vec<ContentRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ContentRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> &[ContentRecord] {
        &self.records[self.records.len().saturating_sub(n)..]
    }

    /// Id for the next record: one past the last stored id. Equals
    /// `len() + 1` for a contiguous history and never reuses an id when a
    /// loaded history has gaps.
    pub fn next_sequence_id(&self) -> u64 {
        self.records.last().map_or(0, |r| r.sequence_id) + 1
    }

    /// Overwrite `path` with the full history. Logs and returns false on failure.
    pub fn save(&self, path: &Path) -> bool {
        match self.write_to(path) {
            Ok(()) => {
                info!("Jokes history saved to {} ({} records)", path.display(), self.len());
                true
            }
            Err(e) => {
                error!("{e}");
                false
            }
        }
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let persist_failed = |source: std::io::Error| AppError::PersistFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist_failed)?;
        }
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| persist_failed(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(persist_failed)
    }

    /// Load the history at `path`. A missing file yields an empty history;
    /// an unreadable or corrupt one is logged and also yields an empty history.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No history file at {}", path.display());
            return Self::new();
        }
        match Self::read_from(path) {
            Ok(records) => {
                info!("Loaded {} jokes from history", records.len());
                Self { records }
            }
            Err(e) => {
                warn!("{e}, starting with empty history");
                Self::new()
            }
        }
    }

    fn read_from(path: &Path) -> Result<Vec<ContentRecord>> {
        let contents = fs::read_to_string(path).map_err(|source| AppError::PersistFailed {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| AppError::PersistCorrupt {
            path: path.to_path_buf(),
            source,
        })
    }
}
