#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod deadline;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;
pub mod path;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::storage::StorageResult;

pub use self::deadline::{DEFAULT_STORE_TIMEOUT, DeadlineStore};
pub use self::memory::MemoryDocumentStore;
pub use self::path::{Document, FieldPath, FieldUpdate, PathSegment, Precondition};

/// Key-value document store holding parent documents addressed by a single
/// primary key inside a named table.
///
/// Only whole-field overwrites and list appends are offered: callers that need
/// to edit one element of an embedded list locate it themselves and overwrite
/// its position (or the whole list).
///
/// Both write operations accept an optional [`Precondition`] evaluated against
/// the stored version at write time; a document that no longer satisfies it is
/// left untouched and the write fails with [`StorageError::Conflict`].
///
/// [`StorageError::Conflict`]: crate::dao::storage::StorageError::Conflict
pub trait DocumentStore: Send + Sync {
    /// Point-read of a document; `None` when the key is absent.
    fn get_document(
        &self,
        table: &str,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>>;

    /// Insert or fully replace a document. No merge with a previous version.
    fn put_document(
        &self,
        table: &str,
        key: &str,
        item: Document,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Overwrite every listed path in a single write and return the updated
    /// document, or `None` when the document does not exist.
    fn update_fields(
        &self,
        table: &str,
        key: &str,
        updates: Vec<FieldUpdate>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>>;

    /// Atomically extend the list at `path`. Returns `false` when the document
    /// does not exist.
    fn append_to_list(
        &self,
        table: &str,
        key: &str,
        path: FieldPath,
        values: Vec<Value>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Remove a document. Returns `false` when nothing was stored under `key`.
    fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>>;

    /// Every document of `table`, ordered by key.
    fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>>;

    /// Cheap round-trip proving the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Overwrite a single field without precondition; see
    /// [`DocumentStore::update_fields`].
    fn update_field(
        &self,
        table: &str,
        key: &str,
        path: FieldPath,
        value: Value,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        self.update_fields(table, key, vec![FieldUpdate::new(path, value)], None)
    }
}
