//! Error types for the fetch and settings paths.
//!
//! Per-page fetch errors never leave the fetcher: they are logged and turned
//! into an empty page. Config errors are surfaced to the caller.

use std::path::PathBuf;

/// Why a single result page could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete (timeout, connection, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not the JSON document we expected.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The search API answered with an `error` object.
    #[error("search API error ({code}): {message}")]
    Api { code: i64, message: String },
}

/// Errors from loading, changing or persisting a config store.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown store: {0}")]
    UnknownStore(String),

    #[error("invalid changeset: {0}")]
    InvalidChangeSet(#[from] serde_json::Error),

    /// An entry that would not survive being written and read back.
    #[error("invalid changeset: {0}")]
    InvalidEntry(String),

    #[error("required store file missing: {0}")]
    MissingStore(PathBuf),
}
