use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{Bson, Document as BsonDocument, doc, serialize_to_bson},
    options::ReturnDocument,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    document_store::{Document, DocumentStore, FieldPath, FieldUpdate, Precondition},
    storage::StorageResult,
};

/// Shape of every stored document: the primary key as `_id` next to the
/// caller's fields. The driver's serde integration maps the JSON fields to
/// BSON and back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    fields: Document,
}

/// MongoDB-backed [`DocumentStore`]: one collection per table, the primary key
/// stored as `_id`. Overwrites map to `$set` (dotted positional paths included)
/// and appends to `$push`/`$each`. A write precondition becomes part of the
/// filter, so the check and the write are one atomic operation.
#[derive(Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

fn key_filter(key: &str) -> BsonDocument {
    doc! { "_id": key }
}

/// Filter selecting `key`, narrowed to versions satisfying `guard`.
fn guarded_filter(
    table: &str,
    key: &str,
    guard: Option<&Precondition>,
) -> MongoResult<BsonDocument> {
    let mut filter = key_filter(key);
    if let Some(guard) = guard {
        filter.insert(guard.path.to_string(), to_bson(table, key, &guard.expected)?);
    }
    Ok(filter)
}

fn to_bson(table: &str, key: &str, value: &Value) -> MongoResult<Bson> {
    serialize_to_bson(value).map_err(|err| MongoDaoError::Encode {
        collection: table.to_owned(),
        key: key.to_owned(),
        reason: err.to_string(),
    })
}

impl MongoDocumentStore {
    /// Connect to MongoDB, retrying until the server answers.
    pub async fn connect(config: MongoConfig) -> StorageResult<Self> {
        let database =
            establish_connection(&config.options, &config.database_name, &config.retry).await?;
        Ok(Self { database })
    }

    fn collection(&self, table: &str) -> Collection<StoredDocument> {
        self.database.collection::<StoredDocument>(table)
    }

    async fn get(&self, table: String, key: String) -> MongoResult<Option<Document>> {
        let found = self
            .collection(&table)
            .find_one(key_filter(&key))
            .await
            .map_err(|source| MongoDaoError::LoadDocument {
                collection: table.clone(),
                key: key.clone(),
                source,
            })?;

        Ok(found.map(|stored| stored.fields))
    }

    async fn put(&self, table: String, key: String, item: Document) -> MongoResult<()> {
        let stored = StoredDocument {
            id: key.clone(),
            fields: item,
        };

        self.collection(&table)
            .replace_one(key_filter(&key), &stored)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveDocument {
                collection: table.clone(),
                key: key.clone(),
                source,
            })?;

        Ok(())
    }

    /// Whether `key` is stored at all, to tell a missing document apart from
    /// one whose precondition failed.
    async fn exists(&self, table: &str, key: &str) -> MongoResult<bool> {
        let count = self
            .collection(table)
            .count_documents(key_filter(key))
            .await
            .map_err(|source| MongoDaoError::LoadDocument {
                collection: table.to_owned(),
                key: key.to_owned(),
                source,
            })?;
        Ok(count > 0)
    }

    /// Outcome of a guarded write that matched nothing.
    async fn unmatched(&self, table: &str, key: &str) -> MongoResult<()> {
        if self.exists(table, key).await? {
            return Err(MongoDaoError::PreconditionFailed {
                collection: table.to_owned(),
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    async fn update(
        &self,
        table: String,
        key: String,
        updates: Vec<FieldUpdate>,
        guard: Option<Precondition>,
    ) -> MongoResult<Option<Document>> {
        let mut assignments = BsonDocument::new();
        for FieldUpdate { path, value } in updates {
            assignments.insert(path.to_string(), to_bson(&table, &key, &value)?);
        }

        let updated = self
            .collection(&table)
            .find_one_and_update(
                guarded_filter(&table, &key, guard.as_ref())?,
                doc! { "$set": assignments },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateDocument {
                collection: table.clone(),
                key: key.clone(),
                source,
            })?;

        if updated.is_none() && guard.is_some() {
            self.unmatched(&table, &key).await?;
        }
        Ok(updated.map(|stored| stored.fields))
    }

    async fn append(
        &self,
        table: String,
        key: String,
        path: FieldPath,
        values: Vec<Value>,
        guard: Option<Precondition>,
    ) -> MongoResult<bool> {
        let each = values
            .iter()
            .map(|value| to_bson(&table, &key, value))
            .collect::<MongoResult<Vec<_>>>()?;
        let mut push = BsonDocument::new();
        push.insert(path.to_string(), doc! { "$each": each });

        let result = self
            .collection(&table)
            .update_one(
                guarded_filter(&table, &key, guard.as_ref())?,
                doc! { "$push": push },
            )
            .await
            .map_err(|source| MongoDaoError::UpdateDocument {
                collection: table.clone(),
                key: key.clone(),
                source,
            })?;

        if result.matched_count == 0 && guard.is_some() {
            self.unmatched(&table, &key).await?;
        }
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, table: String, key: String) -> MongoResult<bool> {
        let result = self
            .collection(&table)
            .delete_one(key_filter(&key))
            .await
            .map_err(|source| MongoDaoError::DeleteDocument {
                collection: table.clone(),
                key: key.clone(),
                source,
            })?;

        Ok(result.deleted_count > 0)
    }

    async fn scan_collection(&self, table: String) -> MongoResult<Vec<Document>> {
        let documents: Vec<StoredDocument> = self
            .collection(&table)
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::Scan {
                collection: table.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Scan {
                collection: table.clone(),
                source,
            })?;

        Ok(documents.into_iter().map(|stored| stored.fields).collect())
    }

    async fn ping(&self) -> MongoResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }
}

impl DocumentStore for MongoDocumentStore {
    fn get_document(
        &self,
        table: &str,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.get(table, key).await.map_err(Into::into) })
    }

    fn put_document(
        &self,
        table: &str,
        key: &str,
        item: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.put(table, key, item).await.map_err(Into::into) })
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
                .update(table, key, updates, guard)
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
                .append(table, key, path, values, guard)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { store.delete(table, key).await.map_err(Into::into) })
    }

    fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let store = self.clone();
        let table = table.to_owned();
        Box::pin(async move { store.scan_collection(table).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{deserialize_from_document, serialize_to_document};
    use serde_json::json;

    use super::*;

    #[test]
    fn guard_narrows_the_key_filter() {
        let guard = Precondition::new(FieldPath::field("games").index(1).key("gameId"), json!("b"));

        assert_eq!(guarded_filter("users", "u1", None).unwrap(), doc! { "_id": "u1" });
        assert_eq!(
            guarded_filter("users", "u1", Some(&guard)).unwrap(),
            doc! { "_id": "u1", "games.1.gameId": "b" }
        );
    }

    #[test]
    fn stored_documents_keep_the_key_apart_from_the_fields() {
        let fields = json!({
            "gameId": "g1",
            "questions": [{"questionId": "q1", "question": "?", "isAsked": true}],
            "players": [{"playerId": "p1", "name": "Ana", "score": -3}],
            "winner": null,
        });
        let stored = StoredDocument {
            id: "g1".into(),
            fields: fields.as_object().cloned().unwrap(),
        };

        let bson = serialize_to_document(&stored).unwrap();
        assert_eq!(bson.get_str("_id").unwrap(), "g1");

        let back: StoredDocument = deserialize_from_document(bson).unwrap();
        assert_eq!(back, stored);
        assert!(!back.fields.contains_key("_id"));
    }

    #[test]
    fn values_beyond_bson_integers_are_rejected() {
        let err = to_bson("games", "g1", &json!(u64::MAX)).unwrap_err();
        assert!(matches!(err, MongoDaoError::Encode { .. }));
    }
}
