use std::sync::Arc;

use crate::{
    config::TableNames,
    dao::document_store::DocumentStore,
    services::collection_editor::{CollectionEditor, ShortIdGenerator},
};

/// Handle on [`AppState`] given to every handler.
pub type SharedState = Arc<AppState>;

/// Central application state: the injected store client and what is built on it.
pub struct AppState {
    store: Arc<dyn DocumentStore>,
    editor: CollectionEditor,
    tables: TableNames,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(store: Arc<dyn DocumentStore>, tables: TableNames) -> SharedState {
        let editor = CollectionEditor::new(store.clone(), Arc::new(ShortIdGenerator));
        Arc::new(Self {
            store,
            editor,
            tables,
        })
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Editor of embedded lists bound to the same store.
    pub(crate) fn editor(&self) -> &CollectionEditor {
        &self.editor
    }

    pub(crate) fn tables(&self) -> &TableNames {
        &self.tables
    }
}
