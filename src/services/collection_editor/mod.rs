//! Editing of lists embedded inside a parent document.
//!
//! The store only offers whole-field overwrites and list appends, so replacing
//! or removing one element is two round trips: read the parent, locate the
//! element, then overwrite its position (or the whole list). Nothing isolates
//! the read from the write; a concurrent edit of the same parent in between can
//! be lost.

mod elements;
mod ids;

use std::{fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use validator::Validate;

use crate::{
    dao::{
        document_store::{Document, DocumentStore, FieldPath, FieldUpdate, Precondition, path},
        models::encode,
        storage::StorageError,
    },
    error::ServiceError,
};

pub use self::ids::{IdGenerator, ShortIdGenerator};

/// Element stored inside a list field of a parent document.
pub trait EmbeddedElement: Serialize + DeserializeOwned + Send + 'static {
    /// Name used in error messages.
    const KIND: &'static str;
    /// Field of the parent holding the list.
    const LIST_FIELD: &'static str;
    /// Field of the element holding its identifier.
    const ID_FIELD: &'static str;

    /// Creation input.
    type Draft: Validate + Send;
    /// Replacement values.
    type Update: Validate + Send;

    /// Build a new element with its defaults applied.
    fn from_draft(id: String, draft: Self::Draft) -> Self;

    /// Apply `update`, keeping the identifier and every field it does not name.
    fn with_update(self, update: Self::Update) -> Self;
}

/// Parent whose embedded state can be reset in a single combined write.
pub trait Resettable: Serialize + DeserializeOwned + Send {
    /// Fields rewritten by [`Resettable::reset`].
    const RESET_FIELDS: &'static [&'static str];

    /// Return every embedded element to its initial state.
    fn reset(&mut self);
}

/// Address of a parent object: a stored document, or an element nested in one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    kind: &'static str,
    table: String,
    key: String,
    prefix: FieldPath,
    anchor: Option<Anchor>,
}

/// Identity a nested parent had when it was located.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Anchor {
    id_field: &'static str,
    id: String,
}

impl ParentRef {
    /// A top-level document of `table`.
    pub fn document(kind: &'static str, table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            key: key.into(),
            prefix: FieldPath::root(),
            anchor: None,
        }
    }

    fn field(&self, name: &str) -> FieldPath {
        self.prefix.clone().key(name)
    }

    /// Condition every write through a nested reference carries: the element
    /// at `prefix` still has the identifier it had when it was located.
    fn guard(&self) -> Option<Precondition> {
        self.anchor.as_ref().map(|anchor| {
            Precondition::new(
                self.prefix.clone().key(anchor.id_field),
                Value::String(anchor.id.clone()),
            )
        })
    }

    fn id(&self) -> &str {
        self.anchor
            .as_ref()
            .map_or(self.key.as_str(), |anchor| anchor.id.as_str())
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.id())
    }
}

/// Position of the first element of `list` whose `id_field` equals `id`.
pub fn locate(list: &[Value], id_field: &str, id: &str) -> Option<usize> {
    list.iter()
        .position(|element| element.get(id_field).and_then(Value::as_str) == Some(id))
}

/// Generic editor of embedded lists, shared by every service.
#[derive(Clone)]
pub struct CollectionEditor {
    store: Arc<dyn DocumentStore>,
    ids: Arc<dyn IdGenerator>,
}

impl CollectionEditor {
    /// Editor writing through `store` and naming new elements with `ids`.
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Fresh identifier from the configured generator.
    pub fn generate_id(&self) -> String {
        self.ids.generate()
    }

    /// Create an element from `draft` and append it in a single write.
    pub async fn append<T: EmbeddedElement>(
        &self,
        parent: &ParentRef,
        draft: T::Draft,
    ) -> Result<T, ServiceError> {
        draft.validate()?;

        let element = T::from_draft(self.ids.generate(), draft);
        let path = parent.field(T::LIST_FIELD);
        let appended = self
            .store
            .append_to_list(
                &parent.table,
                &parent.key,
                path.clone(),
                vec![to_value(&element)?],
                parent.guard(),
            )
            .await
            .map_err(|err| write_error(parent, err))?;

        if !appended {
            return Err(ServiceError::NotFound(format!("{parent} not found")));
        }

        debug!(table = %parent.table, key = %parent.key, path = %path, "appended {}", T::KIND);
        Ok(element)
    }

    /// Replace the element identified by `element_id` with `update` applied.
    pub async fn replace<T: EmbeddedElement>(
        &self,
        parent: &ParentRef,
        element_id: &str,
        update: T::Update,
    ) -> Result<T, ServiceError> {
        update.validate()?;
        self.replace_with(parent, element_id, |current: T| {
            Ok(current.with_update(update))
        })
        .await
    }

    /// Replace the element identified by `element_id` with whatever `update`
    /// derives from its current value. An error from `update` aborts before
    /// any write.
    pub async fn replace_with<T, F>(
        &self,
        parent: &ParentRef,
        element_id: &str,
        update: F,
    ) -> Result<T, ServiceError>
    where
        T: EmbeddedElement,
        F: FnOnce(T) -> Result<T, ServiceError> + Send,
    {
        let document = self.read(parent).await?;
        let list = list_at(&document, parent, T::LIST_FIELD)?;
        let position = locate(list, T::ID_FIELD, element_id)
            .ok_or_else(|| missing_element::<T>(parent, element_id))?;

        let current = decode_element::<T>(parent, &list[position])?;
        let replacement = update(current)?;
        let value = to_value(&replacement)?;
        if value.get(T::ID_FIELD).and_then(Value::as_str) != Some(element_id) {
            return Err(ServiceError::Internal(format!(
                "{} `{element_id}` lost its identifier during the update",
                T::KIND
            )));
        }

        let path = parent.field(T::LIST_FIELD).index(position);
        self.overwrite(parent, vec![FieldUpdate::new(path, value)])
            .await?;
        Ok(replacement)
    }

    /// Remove the element identified by `element_id` and return it.
    pub async fn remove<T: EmbeddedElement>(
        &self,
        parent: &ParentRef,
        element_id: &str,
    ) -> Result<T, ServiceError> {
        let document = self.read(parent).await?;
        let list = list_at(&document, parent, T::LIST_FIELD)?;
        let position = locate(list, T::ID_FIELD, element_id)
            .ok_or_else(|| missing_element::<T>(parent, element_id))?;

        let mut remaining = list.to_vec();
        let removed = remaining.remove(position);
        let removed = decode_element::<T>(parent, &removed)?;

        let path = parent.field(T::LIST_FIELD);
        self.overwrite(parent, vec![FieldUpdate::new(path, Value::Array(remaining))])
            .await?;
        Ok(removed)
    }

    /// Reset the parent's embedded state and write every reset field at once.
    pub async fn reset_collection<P: Resettable>(&self, parent: &ParentRef) -> Result<P, ServiceError> {
        let document = self.read(parent).await?;
        let object = parent_object(&document, parent)?;

        let mut entity: P = serde_json::from_value(Value::Object(object.clone()))
            .map_err(|err| StorageError::malformed(&parent.table, &parent.key, err.to_string()))?;
        entity.reset();

        let encoded = encode(&entity)?;
        let updates = P::RESET_FIELDS
            .iter()
            .map(|field| {
                let value = encoded.get(*field).cloned().unwrap_or(Value::Null);
                FieldUpdate::new(parent.field(field), value)
            })
            .collect();

        self.overwrite(parent, updates).await?;
        Ok(entity)
    }

    /// Resolve an element of `parent` so that its own lists can be edited.
    pub async fn child<T: EmbeddedElement>(
        &self,
        parent: &ParentRef,
        element_id: &str,
    ) -> Result<ParentRef, ServiceError> {
        let document = self.read(parent).await?;
        let list = list_at(&document, parent, T::LIST_FIELD)?;
        let position = locate(list, T::ID_FIELD, element_id)
            .ok_or_else(|| missing_element::<T>(parent, element_id))?;

        Ok(ParentRef {
            kind: T::KIND,
            table: parent.table.clone(),
            key: parent.key.clone(),
            prefix: parent.field(T::LIST_FIELD).index(position),
            anchor: Some(Anchor {
                id_field: T::ID_FIELD,
                id: element_id.to_owned(),
            }),
        })
    }

    async fn read(&self, parent: &ParentRef) -> Result<Document, ServiceError> {
        self.store
            .get_document(&parent.table, &parent.key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{parent} not found")))
    }

    async fn overwrite(
        &self,
        parent: &ParentRef,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), ServiceError> {
        let paths = updates
            .iter()
            .map(|update| update.path.to_string())
            .collect::<Vec<_>>();

        let updated = self
            .store
            .update_fields(&parent.table, &parent.key, updates, parent.guard())
            .await
            .map_err(|err| write_error(parent, err))?;

        if updated.is_none() {
            return Err(ServiceError::NotFound(format!("{parent} not found")));
        }

        debug!(table = %parent.table, key = %parent.key, ?paths, "overwrote embedded fields");
        Ok(())
    }
}

/// Object addressed by `parent` inside its document, checked against the
/// identity it had when it was located.
fn parent_object<'a>(document: &'a Document, parent: &ParentRef) -> Result<&'a Document, ServiceError> {
    let object = path::object_at(document, &parent.prefix)
        .ok_or_else(|| ServiceError::NotFound(format!("{parent} not found")))?;

    if let Some(anchor) = &parent.anchor {
        let current = object.get(anchor.id_field).and_then(Value::as_str);
        if current != Some(anchor.id.as_str()) {
            return Err(ServiceError::NotFound(format!("{parent} not found")));
        }
    }

    Ok(object)
}

fn list_at<'a>(
    document: &'a Document,
    parent: &ParentRef,
    field: &str,
) -> Result<&'a [Value], ServiceError> {
    match parent_object(document, parent)?.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(StorageError::malformed(
            &parent.table,
            &parent.key,
            format!("`{}` is not a list", parent.field(field)),
        )
        .into()),
    }
}

fn decode_element<T: EmbeddedElement>(parent: &ParentRef, value: &Value) -> Result<T, ServiceError> {
    serde_json::from_value(value.clone()).map_err(|err| {
        StorageError::malformed(&parent.table, &parent.key, format!("{}: {err}", T::KIND)).into()
    })
}

fn missing_element<T: EmbeddedElement>(parent: &ParentRef, element_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("{} `{element_id}` not found in {parent}", T::KIND))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|err| ServiceError::Internal(err.to_string()))
}

/// A path that no longer resolves, or a nested parent that no longer holds
/// its identifier, means the parent changed since it was read.
fn write_error(parent: &ParentRef, err: StorageError) -> ServiceError {
    match err {
        StorageError::InvalidPath { .. } | StorageError::Conflict { .. } => {
            ServiceError::Conflict(format!("{parent} changed while it was being edited"))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::future::{self, BoxFuture};
    use serde_json::json;

    use super::*;
    use crate::{
        dao::{
            document_store::{DeadlineStore, MemoryDocumentStore},
            models::{GameEntity, PlayerEntity, QuestionEntity, UserEntity},
            storage::StorageResult,
        },
        dto::game::{
            CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, UpdatePlayerRequest,
            UpdateQuestionRequest,
        },
    };

    /// Memory store counting the writes it receives, optionally never
    /// answering reads.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryDocumentStore,
        writes: AtomicUsize,
        stall_reads: bool,
    }

    impl CountingStore {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn record(&self) {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl DocumentStore for CountingStore {
        fn get_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            if self.stall_reads {
                return Box::pin(future::pending());
            }
            self.inner.get_document(table, key)
        }

        fn put_document(&self, table: &str, key: &str, item: Document) -> BoxFuture<'static, StorageResult<()>> {
            self.record();
            self.inner.put_document(table, key, item)
        }

        fn update_fields(
            &self,
            table: &str,
            key: &str,
            updates: Vec<FieldUpdate>,
            guard: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            self.record();
            self.inner.update_fields(table, key, updates, guard)
        }

        fn append_to_list(
            &self,
            table: &str,
            key: &str,
            path: FieldPath,
            values: Vec<Value>,
            guard: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            self.record();
            self.inner.append_to_list(table, key, path, values, guard)
        }

        fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
            self.record();
            self.inner.delete_document(table, key)
        }

        fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
            self.inner.scan(table)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
    }

    /// Always hands out the same identifier.
    struct FixedIds(&'static str);

    impl IdGenerator for FixedIds {
        fn generate(&self) -> String {
            self.0.to_owned()
        }
    }

    fn game_ref() -> ParentRef {
        ParentRef::document("game", "games", "g1")
    }

    async fn seeded(ids: Arc<dyn IdGenerator>) -> (Arc<CountingStore>, CollectionEditor) {
        let store = Arc::new(CountingStore::default());
        let game = GameEntity::new("g1".into(), "Trivia Night".into());
        store
            .inner
            .put_document("games", "g1", encode(&game).unwrap())
            .await
            .unwrap();
        let editor = CollectionEditor::new(store.clone(), ids);
        (store, editor)
    }

    async fn stored_game(store: &CountingStore) -> GameEntity {
        let document = store.inner.get_document("games", "g1").await.unwrap().unwrap();
        serde_json::from_value(Value::Object(document)).unwrap()
    }

    fn player(name: &str) -> CreatePlayerRequest {
        CreatePlayerRequest { name: name.into() }
    }

    #[tokio::test]
    async fn append_generates_distinct_ids_and_applies_defaults() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;

        let mut ids = HashSet::new();
        for n in 0..25 {
            let created: PlayerEntity = editor
                .append(&game_ref(), player(&format!("player {n}")))
                .await
                .unwrap();
            assert_eq!(created.score, 0);
            ids.insert(created.player_id);
        }

        assert_eq!(ids.len(), 25);
        assert_eq!(store.writes(), 25);
    }

    #[tokio::test]
    async fn appends_keep_insertion_order() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        for text in ["first", "second", "third"] {
            let created: QuestionEntity = editor
                .append(&game_ref(), CreateQuestionRequest { question: text.into() })
                .await
                .unwrap();
            assert!(!created.is_asked);
        }

        let questions = stored_game(&store)
            .await
            .questions
            .into_iter()
            .map(|question| question.question)
            .collect::<Vec<_>>();
        assert_eq!(questions, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn duplicate_ids_resolve_to_the_first_position() {
        let (store, editor) = seeded(Arc::new(FixedIds("dup"))).await;
        editor.append::<PlayerEntity>(&game_ref(), player("Ana")).await.unwrap();
        editor.append::<PlayerEntity>(&game_ref(), player("Ben")).await.unwrap();

        let updated: PlayerEntity = editor
            .replace(
                &game_ref(),
                "dup",
                UpdatePlayerRequest {
                    name: "Ana".into(),
                    score: 7,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.score, 7);

        let players = stored_game(&store).await.players;
        assert_eq!(players.len(), 2);
        assert_eq!((players[0].name.as_str(), players[0].score), ("Ana", 7));
        assert_eq!((players[1].name.as_str(), players[1].score), ("Ben", 0));
    }

    #[tokio::test]
    async fn duplicate_ids_remove_only_the_first_match() {
        let (store, editor) = seeded(Arc::new(FixedIds("dup"))).await;
        editor.append::<PlayerEntity>(&game_ref(), player("Ana")).await.unwrap();
        let ben: PlayerEntity = editor.append(&game_ref(), player("Ben")).await.unwrap();

        let removed: PlayerEntity = editor.remove(&game_ref(), "dup").await.unwrap();
        assert_eq!(removed.name, "Ana");

        let players = stored_game(&store).await.players;
        assert_eq!(players, vec![ben]);
        assert_eq!((players[0].name.as_str(), players[0].score), ("Ben", 0));
    }

    #[tokio::test]
    async fn missing_element_is_not_found_without_writing() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        editor.append::<PlayerEntity>(&game_ref(), player("Ana")).await.unwrap();
        let before = store.writes();

        let replaced = editor
            .replace::<PlayerEntity>(
                &game_ref(),
                "nope",
                UpdatePlayerRequest {
                    name: "x".into(),
                    score: 1,
                },
            )
            .await;
        let removed = editor.remove::<PlayerEntity>(&game_ref(), "nope").await;
        let adjusted = editor
            .replace_with::<PlayerEntity, _>(&game_ref(), "nope", Ok)
            .await;

        assert!(matches!(replaced, Err(ServiceError::NotFound(_))));
        assert!(matches!(removed, Err(ServiceError::NotFound(_))));
        assert!(matches!(adjusted, Err(ServiceError::NotFound(_))));
        assert_eq!(store.writes(), before);
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let (_, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        let ghost = ParentRef::document("game", "games", "ghost");

        let appended = editor.append::<PlayerEntity>(&ghost, player("Ana")).await;
        let reset = editor.reset_collection::<GameEntity>(&ghost).await;

        assert!(matches!(appended, Err(ServiceError::NotFound(message)) if message.contains("ghost")));
        assert!(matches!(reset, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_writing() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        let result = editor.append::<PlayerEntity>(&game_ref(), player("  ")).await;

        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn remove_returns_the_element_and_keeps_the_rest_in_order() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        let mut ids = Vec::new();
        for name in ["Ana", "Ben", "Cleo"] {
            let created: PlayerEntity = editor.append(&game_ref(), player(name)).await.unwrap();
            ids.push(created.player_id);
        }

        let removed: PlayerEntity = editor.remove(&game_ref(), &ids[1]).await.unwrap();
        assert_eq!(removed.name, "Ben");

        let names = stored_game(&store)
            .await
            .players
            .into_iter()
            .map(|player| player.name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["Ana", "Cleo"]);
    }

    #[tokio::test]
    async fn reset_clears_scores_flags_and_winner_in_one_write() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        let ana: PlayerEntity = editor.append(&game_ref(), player("Ana")).await.unwrap();
        let question: QuestionEntity = editor
            .append(&game_ref(), CreateQuestionRequest { question: "q".into() })
            .await
            .unwrap();
        editor
            .replace::<PlayerEntity>(
                &game_ref(),
                &ana.player_id,
                UpdatePlayerRequest {
                    name: "Ana".into(),
                    score: 12,
                },
            )
            .await
            .unwrap();
        editor
            .replace::<QuestionEntity>(
                &game_ref(),
                &question.question_id,
                UpdateQuestionRequest {
                    question: "q".into(),
                    is_asked: true,
                },
            )
            .await
            .unwrap();
        store
            .inner
            .update_field("games", "g1", FieldPath::field("winner"), json!(ana.player_id))
            .await
            .unwrap();

        let before = store.writes();
        let reset: GameEntity = editor.reset_collection(&game_ref()).await.unwrap();
        assert_eq!(store.writes(), before + 1);

        let stored = stored_game(&store).await;
        assert_eq!(stored, reset);
        assert!(stored.players.iter().all(|player| player.score == 0));
        assert!(stored.questions.iter().all(|question| !question.is_asked));
        assert_eq!(stored.winner, None);
        assert_eq!(stored.title, "Trivia Night");
    }

    #[tokio::test]
    async fn nested_games_are_edited_through_child_refs() {
        let store = Arc::new(MemoryDocumentStore::new());
        let user = UserEntity {
            user_id: "u1".into(),
            username: "ana".into(),
            games: Vec::new(),
        };
        store
            .put_document("users", "u1", encode(&user).unwrap())
            .await
            .unwrap();
        let editor = CollectionEditor::new(store.clone(), Arc::new(ShortIdGenerator));
        let user_ref = ParentRef::document("user", "users", "u1");

        let first: GameEntity = editor
            .append(&user_ref, CreateGameRequest { title: "one".into() })
            .await
            .unwrap();
        let second: GameEntity = editor
            .append(&user_ref, CreateGameRequest { title: "two".into() })
            .await
            .unwrap();

        let nested = editor.child::<GameEntity>(&user_ref, &second.game_id).await.unwrap();
        assert_eq!(nested.prefix.to_string(), "games.1");
        editor
            .append::<QuestionEntity>(&nested, CreateQuestionRequest { question: "q".into() })
            .await
            .unwrap();

        let document = store.get_document("users", "u1").await.unwrap().unwrap();
        let stored: UserEntity = serde_json::from_value(Value::Object(document)).unwrap();
        assert!(stored.games[0].questions.is_empty());
        assert_eq!(stored.games[1].questions.len(), 1);

        // Removing the first game leaves the stale position past the end of the list.
        editor.remove::<GameEntity>(&user_ref, &first.game_id).await.unwrap();
        let stale = editor
            .append::<QuestionEntity>(&nested, CreateQuestionRequest { question: "late".into() })
            .await;
        assert!(matches!(stale, Err(ServiceError::Conflict(_))));
    }

    /// Memory store that drops the first game of the written user right
    /// before each update or append lands, like a concurrent delete.
    #[derive(Default)]
    struct ShiftingStore {
        inner: MemoryDocumentStore,
    }

    impl ShiftingStore {
        fn shifted<T: Send + 'static>(
            &self,
            table: &str,
            key: &str,
            write: BoxFuture<'static, StorageResult<T>>,
        ) -> BoxFuture<'static, StorageResult<T>> {
            let inner = self.inner.clone();
            let (table, key) = (table.to_owned(), key.to_owned());
            Box::pin(async move {
                if let Some(document) = inner.get_document(&table, &key).await? {
                    let mut games = document
                        .get("games")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    if !games.is_empty() {
                        games.remove(0);
                    }
                    inner
                        .update_field(&table, &key, FieldPath::field("games"), Value::Array(games))
                        .await?;
                }
                write.await
            })
        }
    }

    impl DocumentStore for ShiftingStore {
        fn get_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            self.inner.get_document(table, key)
        }

        fn put_document(&self, table: &str, key: &str, item: Document) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.put_document(table, key, item)
        }

        fn update_fields(
            &self,
            table: &str,
            key: &str,
            updates: Vec<FieldUpdate>,
            guard: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            let write = self.inner.update_fields(table, key, updates, guard);
            self.shifted(table, key, write)
        }

        fn append_to_list(
            &self,
            table: &str,
            key: &str,
            path: FieldPath,
            values: Vec<Value>,
            guard: Option<Precondition>,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            let write = self.inner.append_to_list(table, key, path, values, guard);
            self.shifted(table, key, write)
        }

        fn delete_document(&self, table: &str, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_document(table, key)
        }

        fn scan(&self, table: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
            self.inner.scan(table)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
    }

    /// Stores user `u1` owning one game per id, each with a single player `p`
    /// scoring 3.
    async fn seed_user(store: &MemoryDocumentStore, game_ids: &[&str]) -> ParentRef {
        let games = game_ids
            .iter()
            .map(|id| {
                let mut game = GameEntity::new((*id).into(), format!("game {id}"));
                game.players.push(PlayerEntity {
                    player_id: "p".into(),
                    name: format!("player of {id}"),
                    score: 3,
                });
                game
            })
            .collect();
        let user = UserEntity {
            user_id: "u1".into(),
            username: "ana".into(),
            games,
        };
        store
            .put_document("users", "u1", encode(&user).unwrap())
            .await
            .unwrap();
        ParentRef::document("user", "users", "u1")
    }

    async fn stored_user(store: &MemoryDocumentStore) -> UserEntity {
        let document = store.get_document("users", "u1").await.unwrap().unwrap();
        serde_json::from_value(Value::Object(document)).unwrap()
    }

    fn game_ids(user: &UserEntity) -> Vec<&str> {
        user.games.iter().map(|game| game.game_id.as_str()).collect()
    }

    #[tokio::test]
    async fn stale_child_ref_never_writes_into_the_next_game() {
        let store = Arc::new(MemoryDocumentStore::new());
        let user_ref = seed_user(&store, &["A", "B", "C"]).await;
        let editor = CollectionEditor::new(store.clone(), Arc::new(ShortIdGenerator));

        let stale_b = editor.child::<GameEntity>(&user_ref, "B").await.unwrap();
        editor.remove::<GameEntity>(&user_ref, "A").await.unwrap();

        // B now sits at index 0 and C at the index the stale reference holds.
        let appended = editor
            .append::<QuestionEntity>(&stale_b, CreateQuestionRequest { question: "for B".into() })
            .await;
        let adjusted = editor
            .replace_with::<PlayerEntity, _>(&stale_b, "p", |mut player| {
                player.score += 5;
                Ok(player)
            })
            .await;
        let reset = editor.reset_collection::<GameEntity>(&stale_b).await;

        assert!(matches!(appended, Err(ServiceError::Conflict(_))));
        assert!(matches!(adjusted, Err(ServiceError::NotFound(_))));
        assert!(matches!(reset, Err(ServiceError::NotFound(_))));

        let stored = stored_user(&store).await;
        assert_eq!(game_ids(&stored), ["B", "C"]);
        assert!(stored.games.iter().all(|game| game.questions.is_empty()));
        assert!(stored.games.iter().all(|game| game.players[0].score == 3));
    }

    #[tokio::test]
    async fn list_shifting_between_read_and_write_is_a_conflict() {
        let store = Arc::new(ShiftingStore::default());
        let user_ref = seed_user(&store.inner, &["A", "B", "C", "D"]).await;
        let editor = CollectionEditor::new(store.clone(), Arc::new(ShortIdGenerator));

        let game_b = editor.child::<GameEntity>(&user_ref, "B").await.unwrap();
        let adjusted = editor
            .replace_with::<PlayerEntity, _>(&game_b, "p", |mut player| {
                player.score += 5;
                Ok(player)
            })
            .await;
        assert!(matches!(adjusted, Err(ServiceError::Conflict(_))));
        assert_eq!(game_ids(&stored_user(&store.inner).await), ["B", "C", "D"]);

        let game_c = editor.child::<GameEntity>(&user_ref, "C").await.unwrap();
        let reset = editor.reset_collection::<GameEntity>(&game_c).await;
        assert!(matches!(reset, Err(ServiceError::Conflict(_))));

        let stored = stored_user(&store.inner).await;
        assert_eq!(game_ids(&stored), ["C", "D"]);
        assert!(stored.games.iter().all(|game| game.players[0].score == 3));
    }

    #[tokio::test]
    async fn rejected_closure_leaves_the_parent_untouched() {
        let (store, editor) = seeded(Arc::new(ShortIdGenerator)).await;
        let ana: PlayerEntity = editor.append(&game_ref(), player("Ana")).await.unwrap();
        let before = store.writes();

        let result = editor
            .replace_with::<PlayerEntity, _>(&game_ref(), &ana.player_id, |_| {
                Err(ServiceError::InvalidInput("nope".into()))
            })
            .await;

        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert_eq!(store.writes(), before);
    }

    #[tokio::test]
    async fn timed_out_read_cancels_without_writing() {
        let counting = Arc::new(CountingStore {
            stall_reads: true,
            ..CountingStore::default()
        });
        let bounded = Arc::new(DeadlineStore::new(counting.clone(), Duration::from_millis(10)));
        let editor = CollectionEditor::new(bounded, Arc::new(ShortIdGenerator));

        let result = editor.remove::<PlayerEntity>(&game_ref(), "p1").await;

        assert!(matches!(result, Err(ServiceError::Cancelled(_))));
        assert_eq!(counting.writes(), 0);
    }

    #[test]
    fn locate_returns_the_first_match() {
        let list = vec![
            json!({"playerId": "a"}),
            json!({"playerId": "b"}),
            json!({"playerId": "b"}),
        ];
        assert_eq!(locate(&list, "playerId", "b"), Some(1));
        assert_eq!(locate(&list, "playerId", "z"), None);
    }
}
