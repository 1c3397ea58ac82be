//! Common error types for Harken

use thiserror::Error;

/// Common result type for Harken operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Harken crates
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog file absent or unreadable (fatal at startup)
    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),

    /// Catalog present but structurally invalid (fatal at startup)
    #[error("Catalog malformed: {0}")]
    CatalogMalformed(String),

    /// Trial type string not known to the descriptor registry (fatal)
    #[error("Unknown trial type: {0}")]
    UnknownTrialType(String),

    /// Participant identity rejected (recoverable, re-prompt)
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Required audio slot not played to completion (recoverable)
    #[error("Incomplete playback: {0}")]
    IncompletePlayback(String),

    /// No score selected for the current trial (recoverable)
    #[error("Missing score: {0}")]
    MissingScore(String),

    /// Submitted score lies outside the trial's rating scale (recoverable)
    #[error("Score {score} outside scale [{min}, {max}]")]
    ScoreOutOfRange { score: i32, min: i32, max: i32 },

    /// Result bundle could not be written (fatal to the session)
    #[error("Failed to persist results: {0}")]
    PersistFailure(String),

    /// Rating scale definition inconsistent (label count vs bounds)
    #[error("Invalid rating scale: {0}")]
    InvalidScale(String),

    /// Session token unknown or expired
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Recoverable errors re-present the same prompt to the participant;
    /// everything else ends the session or the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentity(_)
                | Error::IncompletePlayback(_)
                | Error::MissingScore(_)
                | Error::ScoreOutOfRange { .. }
        )
    }
}
