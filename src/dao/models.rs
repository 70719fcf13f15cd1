use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::dao::{
    document_store::Document,
    storage::{StorageError, StorageResult},
};

/// Primary key attribute of a game document.
pub const GAME_KEY: &str = "gameId";
/// Primary key attribute of a user document.
pub const USER_KEY: &str = "userId";

/// Question embedded in a game; it has no storage key of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEntity {
    /// Identifier, unique within the parent game.
    pub question_id: String,
    /// Text read out to the players.
    pub question: String,
    /// Whether the question has already been asked this round.
    #[serde(default)]
    pub is_asked: bool,
}

/// Player embedded in a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Identifier, unique within the parent game.
    pub player_id: String,
    pub name: String,
    #[serde(default)]
    pub score: i64,
}

/// Game document. Stored top-level in the games table, or embedded in a user's
/// `games` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameEntity {
    /// Primary key (or identifier within the owning user).
    pub game_id: String,
    /// Display name of the quiz.
    pub title: String,
    /// Questions in insertion order.
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
    /// Players in insertion order.
    #[serde(default)]
    pub players: Vec<PlayerEntity>,
    /// Identifier of the winning player, if one was declared.
    #[serde(default)]
    pub winner: Option<String>,
}

impl GameEntity {
    /// Fresh game with empty lists and no winner.
    pub fn new(game_id: String, title: String) -> Self {
        Self {
            game_id,
            title,
            questions: Vec::new(),
            players: Vec::new(),
            winner: None,
        }
    }
}

/// User document owning a list of embedded games.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub games: Vec<GameEntity>,
}

/// Serialize an entity into the document shape handed to the store.
pub fn encode<T: Serialize>(entity: &T) -> StorageResult<Document> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StorageError::malformed(
            "-",
            "-",
            format!("expected an object, got {other}"),
        )),
        Err(err) => Err(StorageError::malformed("-", "-", err.to_string())),
    }
}

/// Decode a stored document into an entity.
pub fn decode<T: DeserializeOwned>(table: &str, key: &str, document: Document) -> StorageResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|err| StorageError::malformed(table, key, err.to_string()))
}
