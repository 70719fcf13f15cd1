use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::time::timeout;
use tracing::warn;

use super::{Document, DocumentStore, FieldPath, FieldUpdate, Precondition};
use crate::dao::storage::{StorageError, StorageResult};

/// Default upper bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`DocumentStore`] wrapper abandoning any call that outlives `limit`.
///
/// Dropping the inner future cancels the in-flight request; the caller sees
/// [`StorageError::TimedOut`].
#[derive(Clone)]
pub struct DeadlineStore {
    inner: Arc<dyn DocumentStore>,
    limit: Duration,
}

impl DeadlineStore {
    /// Bound every call of `inner` by `limit`.
    pub fn new(inner: Arc<dyn DocumentStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    fn bounded<T: Send + 'static>(
        &self,
        operation: &'static str,
        call: BoxFuture<'static, StorageResult<T>>,
    ) -> BoxFuture<'static, StorageResult<T>> {
        let limit = self.limit;
        Box::pin(async move {
            match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(operation, ?limit, "store call abandoned after deadline");
                    Err(StorageError::TimedOut { operation, limit })
                }
            }
        })
    }
}

impl DocumentStore for DeadlineStore {
    fn get_document(
        &self,
        table: &str,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        self.bounded("get_document", self.inner.get_document(table, key))
    }

    fn put_document(
        &self,
        table: &str,
        key: &str,
        item: Document,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.bounded("put_document", self.inner.put_document(table, key, item))
    }

    fn update_fields(
        &self,
        table: &str,
        key: &str,
        updates: Vec<FieldUpdate>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        self.bounded(
            "update_fields",
            self.inner.update_fields(table, key, updates, guard),
        )
    }

    fn append_to_list(
        &self,
        table: &str,
        key: &str,
        path: FieldPath,
        values: Vec<Value>,
        guard: Option<Precondition>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.bounded(
            "append_to_list",
            self.inner.append_to_list(table, key, path, values, guard),
        )
    }

    fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        self.bounded("delete_document", self.inner.delete_document(table, key))
    }

    fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        self.bounded("scan", self.inner.scan(table))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.bounded("health_check", self.inner.health_check())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::document_store::MemoryDocumentStore;
    use futures::future;

    /// Store whose calls never complete.
    struct StalledStore;

    impl DocumentStore for StalledStore {
        fn get_document(&self, _: &str, _: &str) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            Box::pin(future::pending())
        }

        fn put_document(&self, _: &str, _: &str, _: Document) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::pending())
        }

        fn update_fields(
            &self,
            _: &str,
            _: &str,
            _: Vec<FieldUpdate>,
            _: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            Box::pin(future::pending())
        }

        fn append_to_list(
            &self,
            _: &str,
            _: &str,
            _: FieldPath,
            _: Vec<Value>,
            _: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::pending())
        }

        fn delete_document(&self, _: &str, _: &str) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(future::pending())
        }

        fn scan(&self, _: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
            Box::pin(future::pending())
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::pending())
        }
    }

    #[tokio::test]
    async fn stalled_calls_time_out() {
        let store = DeadlineStore::new(Arc::new(StalledStore), Duration::from_millis(10));
        let err = store.get_document("games", "g1").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::TimedOut {
                operation: "get_document",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = DeadlineStore::new(
            Arc::new(MemoryDocumentStore::new()),
            Duration::from_secs(1),
        );
        store
            .put_document("games", "g1", Document::new())
            .await
            .unwrap();
        assert!(store.get_document("games", "g1").await.unwrap().is_some());
    }
}
