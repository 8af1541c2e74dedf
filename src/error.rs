//! Error types for the focus-bell library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the persistent state store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The state file could not be read or written
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file did not contain a JSON object
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The state file parsed, but its top level is not a key-value object
    #[error("state file must hold a flat JSON object")]
    NotAnObject,
}

/// Errors raised when scheduling a deferred notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No runtime is available to deliver the notification
    #[error("notification runtime unavailable: {0}")]
    Unavailable(String),

    /// The notifier refused the request
    #[error("notification '{id}' rejected: {reason}")]
    Rejected { id: String, reason: String },
}
