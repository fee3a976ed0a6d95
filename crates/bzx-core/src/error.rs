//! Error types for bzx

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("storage root unusable: {path}: {source}")]
    StorageRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("notify failed: {notifier} - {message}")]
    NotifyFailed { notifier: String, message: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn storage_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageRoot {
            path: path.into(),
            source,
        }
    }

    pub fn notify_failed(notifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotifyFailed {
            notifier: notifier.into(),
            message: message.into(),
        }
    }

    /// Only a storage root failure stops the service.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StorageRoot { .. })
    }
}
