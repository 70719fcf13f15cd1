use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for the MongoDB backend.
pub(crate) type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB backend, folded into
/// [`StorageError`](crate::dao::storage::StorageError) at the trait boundary.
#[derive(Debug, Error)]
pub(crate) enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to load `{collection}/{key}`")]
    LoadDocument {
        collection: String,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save `{collection}/{key}`")]
    SaveDocument {
        collection: String,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update `{collection}/{key}`")]
    UpdateDocument {
        collection: String,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete `{collection}/{key}`")]
    DeleteDocument {
        collection: String,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to scan collection `{collection}`")]
    Scan {
        collection: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to encode a value for `{collection}/{key}`: {reason}")]
    Encode {
        collection: String,
        key: String,
        reason: String,
    },
    /// A guarded write found the document in a different state.
    #[error("`{collection}/{key}` no longer satisfies the write precondition")]
    PreconditionFailed { collection: String, key: String },
}
