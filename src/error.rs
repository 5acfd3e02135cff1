//! Error taxonomy shared by every component.
//!
//! None of these are allowed to escape the component that produced them:
//! each public operation logs the error and degrades to a fallback value.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("settings file {} is unreadable: {reason}", path.display())]
    ConfigUnreadable { path: PathBuf, reason: String },

    #[error("failed to write settings to {}: {source}", path.display())]
    ConfigWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to persist history to {}: {source}", path.display())]
    PersistFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("history file {} is corrupt: {source}", path.display())]
    PersistCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Optional collaborator absent at startup. Degrades a feature.
    #[error("{0} is not available")]
    CollaboratorUnavailable(String),

    /// Collaborator present but failed at call time.
    #[error("{collaborator} failed: {reason}")]
    CollaboratorFailed {
        collaborator: String,
        reason: String,
    },

    #[error("playback of {} failed: {reason}", path.display())]
    PlaybackFailed { path: PathBuf, reason: String },
}

impl AppError {
    pub fn collaborator(collaborator: &str, reason: impl std::fmt::Display) -> Self {
        Self::CollaboratorFailed {
            collaborator: collaborator.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn playback(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::PlaybackFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
