//! Error taxonomy for Polystore
//!
//! Six classes, matching the failure taxonomy every provider must honor:
//! validation errors reject synchronously as `Err`; condition failures,
//! not-found, conflicts and backend errors are expected outcomes that the
//! service layer folds into an [`crate::OperationResult`] instead of
//! propagating.

use thiserror::Error;

/// Result type alias using Polystore's `Error` type
pub type Result<T> = std::result::Result<T, Error>;

/// Programmer-facing error type. Only [`Error::Validation`] is expected to
/// cross the public `DatabaseService` boundary as an `Err`; every other
/// variant is caught by the service layer and reported via
/// [`crate::OperationResult`].
#[derive(Error, Debug)]
pub enum Error {
    /// Caller bug: empty table name, null key, non-numeric increment delta,
    /// a reserved or dotted attribute path where the provider forbids it.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Condition tree not satisfied by the current item state.
    #[error("Condition failed: {0}")]
    ConditionFailed(String),

    /// Missing item or table.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write-conflict after CAS exhaustion, or an overwrite refused on Put.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Network/5xx/throttling-class failure; the caller already exhausted
    /// the retry budget in `RetryConfig`.
    #[error("Transient backend error: {0}")]
    TransientBackend(String),

    /// Malformed request, auth failure, or permanently-exceeded quota.
    #[error("Permanent backend error: {0}")]
    PermanentBackend(String),

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure (config file reads, etc).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Validation errors: caller bugs rejected synchronously, before any
/// provider I/O is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("table name must not be empty")]
    EmptyTableName,

    #[error("key attribute name must not be empty")]
    EmptyKeyAttributeName,

    #[error("increment delta must be finite, got {0}")]
    NonFiniteIncrementDelta(String),

    #[error("attribute path `{0}` contains `.`, which this provider cannot express")]
    DottedPathUnsupported(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("page size must be positive")]
    NonPositivePageSize,

    #[error("page token `{0}` is not valid for this provider")]
    InvalidPageToken(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// HTTP-style status code used purely for classification, per §3's
    /// `OperationResult` discipline.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::ConditionFailed(_) => 412,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::TransientBackend(_) | Error::Serialization(_) | Error::Io(_) => 500,
            Error::PermanentBackend(_) => 500,
            Error::Config(_) => 500,
        }
    }
}
