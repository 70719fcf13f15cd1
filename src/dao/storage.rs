use std::{error::Error, time::Duration};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed or could not be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The field path of an update does not resolve inside the target document.
    #[error("invalid field path `{path}` in `{table}/{key}`: {reason}")]
    InvalidPath {
        table: String,
        key: String,
        path: String,
        reason: String,
    },
    /// The document changed underneath the write: a concurrent revision, or
    /// a write precondition that no longer holds.
    #[error("conflicting write on `{table}/{key}`")]
    Conflict { table: String, key: String },
    /// A stored document could not be decoded into the expected shape.
    #[error("malformed document `{table}/{key}`: {message}")]
    Malformed {
        table: String,
        key: String,
        message: String,
    },
    /// The backend did not answer within the configured deadline.
    #[error("`{operation}` exceeded its {limit:?} deadline")]
    TimedOut {
        operation: &'static str,
        limit: Duration,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a malformed-document error for `table/key`.
    pub fn malformed(table: &str, key: &str, message: impl Into<String>) -> Self {
        StorageError::Malformed {
            table: table.to_owned(),
            key: key.to_owned(),
            message: message.into(),
        }
    }
}
