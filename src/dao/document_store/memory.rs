use std::{collections::BTreeMap, sync::Arc};

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use serde_json::Value;

use super::{
    DocumentStore,
    path::{self, Document, FieldPath, FieldUpdate, PathError, Precondition},
};
use crate::dao::storage::{StorageError, StorageResult};

/// Process-local [`DocumentStore`] keeping every table in memory.
///
/// Each table lives behind a single map entry, so a mutation holds that entry's
/// lock for its whole read-apply-write and is atomic with respect to other
/// calls on the same table. Mutations run when the returned future is first
/// polled; a future dropped before that leaves the table untouched.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    tables: Arc<DashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryDocumentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, table: &str, key: &str) -> Option<Document> {
        self.tables
            .get(table)
            .and_then(|documents| documents.get(key).cloned())
    }

    fn put(&self, table: &str, key: &str, item: Document) {
        self.tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.to_owned(), item);
    }

    /// Run `apply` on a copy of the stored document and keep the copy only if
    /// `guard` holds and `apply` succeeds. `None` when the document is absent.
    fn modify<T>(
        &self,
        table: &str,
        key: &str,
        guard: Option<&Precondition>,
        apply: impl FnOnce(&mut Document) -> StorageResult<T>,
    ) -> StorageResult<Option<T>> {
        let Some(mut documents) = self.tables.get_mut(table) else {
            return Ok(None);
        };
        let Some(document) = documents.get_mut(key) else {
            return Ok(None);
        };

        if guard.is_some_and(|guard| !guard.holds(document)) {
            return Err(StorageError::Conflict {
                table: table.to_owned(),
                key: key.to_owned(),
            });
        }

        let mut updated = document.clone();
        let outcome = apply(&mut updated)?;
        *document = updated;
        Ok(Some(outcome))
    }

    fn update(
        &self,
        table: &str,
        key: &str,
        updates: Vec<FieldUpdate>,
        guard: Option<&Precondition>,
    ) -> StorageResult<Option<Document>> {
        self.modify(table, key, guard, |document| {
            for FieldUpdate { path, value } in updates {
                path::set(document, &path, value)
                    .map_err(|err| invalid_path(table, key, &path, err))?;
            }
            Ok(document.clone())
        })
    }

    fn append(
        &self,
        table: &str,
        key: &str,
        path: &FieldPath,
        values: Vec<Value>,
        guard: Option<&Precondition>,
    ) -> StorageResult<bool> {
        let appended = self.modify(table, key, guard, |document| {
            path::append(document, path, values).map_err(|err| invalid_path(table, key, path, err))
        })?;
        Ok(appended.is_some())
    }

    fn delete(&self, table: &str, key: &str) -> bool {
        self.tables
            .get_mut(table)
            .is_some_and(|mut documents| documents.remove(key).is_some())
    }

    fn scan_table(&self, table: &str) -> Vec<Document> {
        self.tables
            .get(table)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn invalid_path(table: &str, key: &str, path: &FieldPath, err: PathError) -> StorageError {
    StorageError::InvalidPath {
        table: table.to_owned(),
        key: key.to_owned(),
        path: path.to_string(),
        reason: err.to_string(),
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_document(
        &self,
        table: &str,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        Box::pin(future::ready(Ok(self.get(table, key))))
    }

    fn put_document(
        &self,
        table: &str,
        key: &str,
        item: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move {
            store.put(&table, &key, item);
            Ok(())
        })
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
        Box::pin(async move { store.update(&table, &key, updates, guard.as_ref()) })
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
        Box::pin(async move { store.append(&table, &key, &path, values, guard.as_ref()) })
    }

    fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let (table, key) = (table.to_owned(), key.to_owned());
        Box::pin(async move { Ok(store.delete(&table, &key)) })
    }

    fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        Box::pin(future::ready(Ok(self.scan_table(table))))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}
