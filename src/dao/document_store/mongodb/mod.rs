mod config;
mod connection;
mod error;
mod store;

pub use config::MongoConfig;
pub use connection::RetryPolicy;
pub use store::MongoDocumentStore;

use crate::dao::storage::StorageError;
use error::MongoDaoError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::PreconditionFailed { collection, key } => StorageError::Conflict {
                table: collection,
                key,
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
