/// Document store abstraction and its backends.
pub mod document_store;
/// Database model definitions.
pub(crate) mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
