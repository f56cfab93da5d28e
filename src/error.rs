//! Error types for lyric lookup, storage and sources

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single source failed during an aggregate search.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_id: String,
    pub error: Error,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_id, self.error)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure or non-success HTTP status.
    #[error("transport error{}: {reason}", fmt_status(.status))]
    Transport { status: Option<u16>, reason: String },

    /// Payload could not be read in the provider's format.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider says the entry has no lyrics.
    #[error("no lyric available for this entry")]
    NoLyricAvailable,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("lookup cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown lyric source: {0}")]
    UnknownSource(String),

    /// Track metadata is not enough to build a query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("all lyric sources failed: {}", join_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),
}

impl Error {
    pub fn transport(status: reqwest::StatusCode) -> Self {
        Self::Transport {
            status: Some(status.as_u16()),
            reason: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Parse(e.to_string());
        }
        if e.is_timeout() {
            return Self::Timeout;
        }
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
