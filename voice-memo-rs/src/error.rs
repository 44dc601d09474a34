//! Error types for the assistant core.
//!
//! `UserError` renders as the sentence spoken back to the user; the other
//! kinds end up in the log and are recovered where they occur.

use std::path::PathBuf;

use thiserror::Error;

/// A time expression matched neither the natural-language grammar nor the
/// numeric-unit fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("could not understand the time \"{0}\"")]
    Unparseable(String),
}

/// Rejections surfaced to the user as plain-language replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("Sorry, I didn't understand that time format")]
    BadTimeFormat(#[from] ResolutionError),

    #[error("That time has already passed! Please set a future reminder.")]
    PastTime,

    #[error("What should I remind you about?")]
    MissingDescription,

    #[error("Please say something to add as a note")]
    EmptyNote,
}

/// Failures reading or writing the data file.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize assistant data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A stored reminder whose due time cannot be read back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("reminder \"{what}\" has a malformed time \"{when}\": {source}")]
    MalformedTimestamp {
        what: String,
        when: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Failures building or opening a web search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search engine URL \"{url}\": {source}")]
    InvalidEngine {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
