//! Unified error types for quire.
//!
//! Every variant renders as `CODE: message` so the code survives being
//! flattened into a string by the tool layer.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Substrings of LMS error codes/messages that will never succeed on retry.
const PERMANENT_ORIGIN_MARKERS: &[&str] = &[
    "invalidtoken",
    "invalid token",
    "accessexception",
    "access control exception",
    "requireloginerror",
    "invalidrecord",
    "invalidparameter",
    "invalid parameter",
    "invalid id",
];

/// Unified error types for quire.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty locator list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The locator does not identify a content item.
    #[error("INVALID_LOCATOR: {0}")]
    InvalidLocator(String),

    /// Filesystem operation failed.
    #[error("CACHE_ERROR: {0}")]
    Io(std::io::Error),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A cached or fetched payload could not be (de)serialized.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),

    /// No credential was supplied for an origin call.
    #[error("MISSING_CREDENTIAL: {0}")]
    MissingCredential(String),

    /// The origin rejected the credential.
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),

    /// The origin returned an error payload.
    #[error("ORIGIN_ERROR: {0}")]
    Origin(String),

    /// The origin has no content for the locator.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Network-level failure talking to the origin.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Non-success HTTP status from the origin.
    #[error("HTTP_ERROR: status {status}")]
    HttpStatus { status: u16 },

    /// Origin request timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Cleaner rules could not be compiled.
    #[error("CLEAN_FAILED: {0}")]
    CleanFailed(String),

    /// Another synchronization job owns this process.
    #[error("SYNC_BUSY: a synchronization job is already running")]
    SyncBusy,
}

impl Error {
    /// Whether retrying the failed operation could plausibly succeed.
    ///
    /// Authentication and invalid-identifier failures are permanent; network,
    /// timeout, storage and 5xx/408/429 failures are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io(_) | Error::Database(_) | Error::HttpError(_) | Error::FetchTimeout(_) => true,
            Error::HttpStatus { status } => *status == 408 || *status == 429 || *status >= 500,
            Error::Origin(msg) => !is_permanent_origin_message(msg),
            _ => false,
        }
    }
}

/// Check an LMS error code or message against the known permanent failures.
pub fn is_permanent_origin_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERMANENT_ORIGIN_MARKERS.iter().any(|marker| lower.contains(marker))
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidLocator(_) => -32602,
            Error::CleanFailed(_) => -32000,
            Error::Io(_) | Error::Database(_) | Error::MigrationFailed(_) | Error::Serialization(_) => -32002,
            Error::MissingCredential(_) => -32003,
            Error::Unauthorized(_) => -32004,
            Error::Origin(_) => -32005,
            Error::NotFound(_) => -32006,
            Error::HttpError(_) | Error::HttpStatus { .. } => -32008,
            Error::FetchTimeout(_) => -32009,
            Error::SyncBusy => -32010,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
