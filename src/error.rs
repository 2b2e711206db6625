//! Error types shared by the engine, the store and the display client

use std::path::PathBuf;

use thiserror::Error;

use crate::state::SessionType;

/// All errors surfaced by tomato-daemon
#[derive(Debug, Error)]
pub enum TomatoError {
    /// Session type changes are refused while a countdown is active
    #[error("cannot switch to {target} while a {current} session is running")]
    SwitchWhileRunning {
        current: SessionType,
        target: SessionType,
    },

    /// The engine task is gone or did not answer
    #[error("session engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted record exists but cannot be decoded
    #[error("corrupted state record at {path}: {source}")]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("notification failed: {0}")]
    Notify(String),

    /// The display client could not reach the engine
    #[error("delivery to engine failed: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TomatoError {
    fn from(err: reqwest::Error) -> Self {
        TomatoError::Delivery(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TomatoError>;
