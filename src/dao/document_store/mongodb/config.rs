use mongodb::options::ClientOptions;

use super::{connection::RetryPolicy, error::MongoDaoError};
use crate::dao::storage::StorageResult;

const DEFAULT_DB: &str = "family_game";

/// Connection settings for the MongoDB backend.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection URI.
    pub options: ClientOptions,
    /// Database holding one collection per table.
    pub database_name: String,
    /// Pacing of the initial ping.
    pub retry: RetryPolicy,
}

impl MongoConfig {
    /// Parse `uri` into client options. Without `db_name` the database is
    /// `family_game`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> StorageResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DB).to_owned(),
            retry: RetryPolicy::default(),
        })
    }
}
