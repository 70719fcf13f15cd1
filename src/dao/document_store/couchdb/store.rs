use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::{Value, from_value};
use tracing::debug;

use crate::dao::{
    document_store::{Document, DocumentStore, FieldPath, FieldUpdate, Precondition, path},
    storage::{StorageError, StorageResult},
};

use super::{
    config::{CouchConfig, CouchCredentials},
    error::{CouchDaoError, CouchResult},
    models::{AllDocsResponse, CouchEnvelope, END_SUFFIX, doc_id, table_prefix},
};

const ALL_DOCS: &str = "_all_docs";

/// CouchDB-backed [`DocumentStore`].
///
/// CouchDB only writes whole documents, so field updates are a read, a local
/// apply and a `PUT` carrying the revision that was read. A concurrent writer
/// makes the `PUT` fail with 409, surfaced as [`StorageError::Conflict`]; a
/// write precondition is checked against the version that was read, so the
/// revision check covers it too.
#[derive(Clone)]
pub struct CouchDocumentStore {
    client: Client,
    database_url: Arc<Url>,
    credentials: Option<Arc<CouchCredentials>>,
}

/// `base` extended with `segments`, each percent-encoded as a single path
/// segment so identifiers containing `/` or `?` stay one resource.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

impl CouchDocumentStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;
        let database_url = endpoint(&config.server_url()?, &[config.database.as_str()]);

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            credentials: config.credentials.map(Arc::new),
        };

        store.ensure_database(&config.database).await?;
        Ok(store)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.as_deref() {
            Some(CouchCredentials { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        }
    }

    /// Request against a resource of the database, `resource` being one path
    /// segment (a document id or `_all_docs`).
    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let url = endpoint(&self.database_url, &[resource]);
        self.authorized(self.client.request(method, url))
    }

    async fn ensure_database(&self, database: &str) -> CouchResult<()> {
        let url = self.database_url.as_str();
        let database = database.to_owned();

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    debug!(database, "created CouchDB database");
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn fetch(&self, doc_id: &str) -> CouchResult<Option<CouchEnvelope>> {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchEnvelope>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn store(&self, table: &str, key: &str, envelope: &CouchEnvelope) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, &envelope.id)
            .json(envelope)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: envelope.id.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(conflict(table, key)),
            other => Err(CouchDaoError::RequestStatus {
                path: envelope.id.clone(),
                status: other,
            }),
        }
    }

    async fn get(&self, table: &str, key: &str) -> CouchResult<Option<Document>> {
        let envelope = self.fetch(&doc_id(table, key)).await?;
        Ok(envelope.map(|envelope| envelope.body))
    }

    async fn put(&self, table: &str, key: &str, item: Document) -> CouchResult<()> {
        let id = doc_id(table, key);
        let rev = self.fetch(&id).await?.and_then(|existing| existing.rev);
        self.store(table, key, &CouchEnvelope::new(id, rev, item))
            .await
    }

    /// Read, check `guard`, mutate locally and write back under the revision
    /// that was read.
    async fn modify(
        &self,
        table: &str,
        key: &str,
        guard: Option<&Precondition>,
        apply: impl FnOnce(&mut Document) -> CouchResult<()>,
    ) -> CouchResult<Option<Document>> {
        let Some(mut envelope) = self.fetch(&doc_id(table, key)).await? else {
            return Ok(None);
        };
        if guard.is_some_and(|guard| !guard.holds(&envelope.body)) {
            return Err(conflict(table, key));
        }

        apply(&mut envelope.body)?;
        self.store(table, key, &envelope).await?;
        Ok(Some(envelope.body))
    }

    async fn update(
        &self,
        table: &str,
        key: &str,
        updates: Vec<FieldUpdate>,
        guard: Option<&Precondition>,
    ) -> CouchResult<Option<Document>> {
        self.modify(table, key, guard, |body| {
            for FieldUpdate { path, value } in updates {
                path::set(body, &path, value)
                    .map_err(|err| invalid_path(table, key, &path, err.to_string()))?;
            }
            Ok(())
        })
        .await
    }

    async fn append(
        &self,
        table: &str,
        key: &str,
        path: &FieldPath,
        values: Vec<Value>,
        guard: Option<&Precondition>,
    ) -> CouchResult<bool> {
        let updated = self
            .modify(table, key, guard, |body| {
                path::append(body, path, values)
                    .map_err(|err| invalid_path(table, key, path, err.to_string()))
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn delete(&self, table: &str, key: &str) -> CouchResult<bool> {
        let id = doc_id(table, key);
        let Some(CouchEnvelope { rev: Some(rev), .. }) = self.fetch(&id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, &id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            StatusCode::CONFLICT => Err(conflict(table, key)),
            other => Err(CouchDaoError::RequestStatus {
                path: id,
                status: other,
            }),
        }
    }

    async fn list(&self, table: &str) -> StorageResult<Vec<Document>> {
        let prefix = table_prefix(table);
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            }
            .into());
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            let Some(doc) = row.doc else {
                continue;
            };
            let envelope: CouchEnvelope = from_value(doc).map_err(|err| {
                let key = row.id.strip_prefix(&prefix).unwrap_or(&row.id);
                StorageError::malformed(table, key, err.to_string())
            })?;
            documents.push(envelope.body);
        }

        Ok(documents)
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url.as_str();
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.to_owned(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url.to_owned(),
                status: response.status(),
            })
        }
    }
}

fn conflict(table: &str, key: &str) -> CouchDaoError {
    CouchDaoError::Conflict {
        table: table.to_owned(),
        key: key.to_owned(),
    }
}

fn invalid_path(table: &str, key: &str, path: &FieldPath, reason: String) -> CouchDaoError {
    CouchDaoError::InvalidPath {
        table: table.to_owned(),
        key: key.to_owned(),
        path: path.to_string(),
        reason,
    }
}

impl DocumentStore for CouchDocumentStore {
    fn get_document(
        &self,
        table: &str,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.get(&table, &key).await.map_err(Into::into) })
    }

    fn put_document(
        &self,
        table: &str,
        key: &str,
        item: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.put(&table, &key, item).await.map_err(Into::into) })
    }

    fn update_fields(
        &self,
        table: &str,
        key: &str,
        updates: Vec<FieldUpdate>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move {
            store
                .update(&table, &key, updates, guard.as_ref())
                .await
                .map_err(Into::into)
        })
    }

    fn append_to_list(
        &self,
        table: &str,
        key: &str,
        path: FieldPath,
        values: Vec<Value>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move {
            store
                .append(&table, &key, &path, values, guard.as_ref())
                .await
                .map_err(Into::into)
        })
    }

    fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.delete(&table, &key).await.map_err(Into::into) })
    }

    fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let store = self.clone();
        let table = table.to_owned();
        Box::pin(async move { store.list(&table).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_stay_a_single_path_segment() {
        let base = Url::parse("http://localhost:5984/").unwrap();
        let database = endpoint(&base, &["family_game"]);
        assert_eq!(database.as_str(), "http://localhost:5984/family_game");

        let document = endpoint(&database, &[&doc_id("games", "a/b?c#d")]);
        assert_eq!(
            document.as_str(),
            "http://localhost:5984/family_game/games::a%2Fb%3Fc%23d"
        );
        assert_eq!(document.query(), None);
    }

    #[test]
    fn path_prefix_of_the_server_is_kept() {
        let base = Url::parse("http://proxy.local/couch").unwrap();
        let url = endpoint(&endpoint(&base, &["db"]), &[ALL_DOCS]);
        assert_eq!(url.path(), "/couch/db/_all_docs");
    }
}
