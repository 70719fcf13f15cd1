//! Request and response payloads for games and their embedded questions and players.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, PlayerEntity, QuestionEntity},
    dto::validation::{MAX_LABEL_LENGTH, validate_not_blank},
};

/// Payload used to create a game (top-level or inside a user).
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub title: String,
}

/// Replacement values for a game's scalar fields.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateGameRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub title: String,
    /// If not specified, the winner is left as is.
    /// If null is specified, the winner is cleared.
    /// If a string is specified, it becomes the winning player's id.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub winner: Option<Option<String>>,
}

/// Payload used to append a question.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1), custom(function = validate_not_blank))]
    pub question: String,
}

/// Replacement values for a question.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1), custom(function = validate_not_blank))]
    pub question: String,
    pub is_asked: bool,
}

/// Payload used to append a player.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePlayerRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub name: String,
}

/// Replacement values for a player.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdatePlayerRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub name: String,
    pub score: i64,
}

/// Request to adjust a player's score by a delta.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScoreAdjustmentRequest {
    pub delta: i64,
}

/// Question as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question_id: String,
    pub question: String,
    pub is_asked: bool,
}

/// Player as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub player_id: String,
    pub name: String,
    pub score: i64,
}

/// Full game as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub game_id: String,
    pub title: String,
    pub questions: Vec<QuestionResponse>,
    pub players: Vec<PlayerResponse>,
    pub winner: Option<String>,
}

impl From<QuestionEntity> for QuestionResponse {
    fn from(value: QuestionEntity) -> Self {
        Self {
            question_id: value.question_id,
            question: value.question,
            is_asked: value.is_asked,
        }
    }
}

impl From<PlayerEntity> for PlayerResponse {
    fn from(value: PlayerEntity) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            score: value.score,
        }
    }
}

impl From<GameEntity> for GameResponse {
    fn from(value: GameEntity) -> Self {
        Self {
            game_id: value.game_id,
            title: value.title,
            questions: value.questions.into_iter().map(Into::into).collect(),
            players: value.players.into_iter().map(Into::into).collect(),
            winner: value.winner,
        }
    }
}
