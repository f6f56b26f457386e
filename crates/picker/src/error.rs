//! Error types for the picker subsystems.
//!
//! None of these are fatal: every caller degrades to "fewer sessions shown"
//! or "a filter not applied" and reports the error as a transient notice.

use thiserror::Error;

/// Errors raised while reading or validating imported schedule data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImportError {
    /// Payload is not valid JSON at all
    #[error("{source_name}: invalid JSON ({message})")]
    InvalidJson {
        source_name: String,
        message: String,
    },

    /// Object has no traversable `subjectScheduleTable.days` list
    #[error("{source_name}: missing subjectScheduleTable.days")]
    MissingDays { source_name: String },

    /// One element of an array payload was rejected
    #[error("{source_name}: entry #{index} is not a valid subject ({message})")]
    InvalidEntry {
        source_name: String,
        index: usize,
        message: String,
    },

    /// The payload parsed but contained nothing importable
    #[error("{source_name}: no importable subjects")]
    Empty { source_name: String },

    /// Reading the payload failed
    #[error("{source_name}: {message}")]
    Io {
        source_name: String,
        message: String,
    },

    /// The opener never delivered data within the wait window
    #[error("Import handshake timed out after {attempts} attempts ({elapsed_secs:.1}s elapsed)")]
    HandshakeTimeout { attempts: u32, elapsed_secs: f64 },

    /// The other side of the handshake went away
    #[error("Import handshake channel closed")]
    ChannelClosed,
}

impl ImportError {
    /// Returns true if the error concerns a single entry and the rest of the
    /// batch may still be imported.
    pub fn is_partial(&self) -> bool {
        matches!(self, ImportError::InvalidEntry { .. })
    }
}

/// Errors from the persisted key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while resolving a room code to a map link.
#[derive(Debug, Error, Clone)]
pub enum RoomLookupError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server returned something other than an autocomplete list
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// The autocomplete list had no usable id
    #[error("No room matches {room}")]
    NotFound { room: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    Url { message: String },
}

impl RoomLookupError {
    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoomLookupError::Network { .. } | RoomLookupError::UnexpectedResponse { .. }
        )
    }
}

impl From<reqwest::Error> for RoomLookupError {
    fn from(err: reqwest::Error) -> Self {
        RoomLookupError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for RoomLookupError {
    fn from(err: url::ParseError) -> Self {
        RoomLookupError::Url {
            message: err.to_string(),
        }
    }
}

/// A session that cannot be projected onto the slot grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("start time {start_time} does not match any slot boundary")]
    UnalignedStart { start_time: String },
}

/// A selection change the timetable refuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no session matches {key}")]
    UnknownSession { key: String },

    #[error("{key} is blocked by {with}")]
    Blocked { key: String, with: String },
}

/// Errors loading the picker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
