//! Business logic behind the `/games` routes. Scalar edits go straight to the
//! store; every change to the question and player lists goes through the
//! [`CollectionEditor`](crate::services::collection_editor::CollectionEditor).
//!
//! The `*_in` helpers take an already resolved parent so the user service can
//! reuse them for games nested in a user document.

use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::{
        document_store::{FieldPath, FieldUpdate},
        models::{GAME_KEY, GameEntity, PlayerEntity, QuestionEntity, decode, encode},
    },
    dto::game::{
        CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, GameResponse,
        PlayerResponse, QuestionResponse, ScoreAdjustmentRequest, UpdateGameRequest,
        UpdatePlayerRequest, UpdateQuestionRequest,
    },
    error::ServiceError,
    services::collection_editor::ParentRef,
    state::SharedState,
};

/// Reference to a top-level game document.
pub(crate) fn game_ref(state: &SharedState, game_id: &str) -> ParentRef {
    ParentRef::document("game", &state.tables().games, game_id)
}

/// Return every stored game.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameResponse>, ServiceError> {
    let table = &state.tables().games;
    let documents = state.store().scan(table).await?;

    documents
        .into_iter()
        .map(|document| -> Result<GameResponse, ServiceError> {
            let key = document
                .get(GAME_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let game: GameEntity = decode(table, &key, document)?;
            Ok(game.into())
        })
        .collect()
}

pub async fn get_game(state: &SharedState, game_id: &str) -> Result<GameResponse, ServiceError> {
    let table = &state.tables().games;
    let document = state
        .store()
        .get_document(table, game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    let game: GameEntity = decode(table, game_id, document)?;
    Ok(game.into())
}

/// Create a game with empty lists and no winner.
pub async fn create_game(
    state: &SharedState,
    payload: CreateGameRequest,
) -> Result<GameResponse, ServiceError> {
    payload.validate()?;

    let game = GameEntity::new(state.editor().generate_id(), payload.title);
    state
        .store()
        .put_document(&state.tables().games, &game.game_id, encode(&game)?)
        .await?;

    info!(game_id = %game.game_id, title = %game.title, "game created");
    Ok(game.into())
}

/// Overwrite the title and, when provided, the winner in one write.
pub async fn update_game(
    state: &SharedState,
    game_id: &str,
    payload: UpdateGameRequest,
) -> Result<GameResponse, ServiceError> {
    payload.validate()?;

    let mut updates = vec![FieldUpdate::new(
        FieldPath::field("title"),
        Value::String(payload.title),
    )];
    if let Some(winner) = payload.winner {
        updates.push(FieldUpdate::new(
            FieldPath::field("winner"),
            winner.map_or(Value::Null, Value::String),
        ));
    }

    let table = &state.tables().games;
    let document = state
        .store()
        .update_fields(table, game_id, updates, None)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    debug!(game_id, "game updated");
    let game: GameEntity = decode(table, game_id, document)?;
    Ok(game.into())
}

/// Delete a game unconditionally.
pub async fn delete_game(state: &SharedState, game_id: &str) -> Result<(), ServiceError> {
    let deleted = state
        .store()
        .delete_document(&state.tables().games, game_id)
        .await?;

    if !deleted {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    info!(game_id, "game deleted");
    Ok(())
}

/// Zero every score, clear every asked flag and the winner.
pub async fn reset_game(state: &SharedState, game_id: &str) -> Result<GameResponse, ServiceError> {
    reset_game_in(state, &game_ref(state, game_id)).await
}

pub async fn add_question(
    state: &SharedState,
    game_id: &str,
    payload: CreateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    add_question_in(state, &game_ref(state, game_id), payload).await
}

pub async fn update_question(
    state: &SharedState,
    game_id: &str,
    question_id: &str,
    payload: UpdateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    update_question_in(state, &game_ref(state, game_id), question_id, payload).await
}

pub async fn delete_question(
    state: &SharedState,
    game_id: &str,
    question_id: &str,
) -> Result<QuestionResponse, ServiceError> {
    delete_question_in(state, &game_ref(state, game_id), question_id).await
}

pub async fn add_player(
    state: &SharedState,
    game_id: &str,
    payload: CreatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    add_player_in(state, &game_ref(state, game_id), payload).await
}

pub async fn update_player(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
    payload: UpdatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    update_player_in(state, &game_ref(state, game_id), player_id, payload).await
}

pub async fn delete_player(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
) -> Result<PlayerResponse, ServiceError> {
    delete_player_in(state, &game_ref(state, game_id), player_id).await
}

/// Add a signed delta to a player's score.
pub async fn adjust_score(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
    payload: ScoreAdjustmentRequest,
) -> Result<PlayerResponse, ServiceError> {
    adjust_score_in(state, &game_ref(state, game_id), player_id, payload).await
}

pub(crate) async fn reset_game_in(
    state: &SharedState,
    game: &ParentRef,
) -> Result<GameResponse, ServiceError> {
    let reset: GameEntity = state.editor().reset_collection(game).await?;
    info!(game = %game, "game reset");
    Ok(reset.into())
}

pub(crate) async fn add_question_in(
    state: &SharedState,
    game: &ParentRef,
    payload: CreateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    let question: QuestionEntity = state.editor().append(game, payload).await?;
    Ok(question.into())
}

pub(crate) async fn update_question_in(
    state: &SharedState,
    game: &ParentRef,
    question_id: &str,
    payload: UpdateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    let question: QuestionEntity = state.editor().replace(game, question_id, payload).await?;
    Ok(question.into())
}

pub(crate) async fn delete_question_in(
    state: &SharedState,
    game: &ParentRef,
    question_id: &str,
) -> Result<QuestionResponse, ServiceError> {
    let question: QuestionEntity = state.editor().remove(game, question_id).await?;
    Ok(question.into())
}

pub(crate) async fn add_player_in(
    state: &SharedState,
    game: &ParentRef,
    payload: CreatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    let player: PlayerEntity = state.editor().append(game, payload).await?;
    Ok(player.into())
}

pub(crate) async fn update_player_in(
    state: &SharedState,
    game: &ParentRef,
    player_id: &str,
    payload: UpdatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    let player: PlayerEntity = state.editor().replace(game, player_id, payload).await?;
    Ok(player.into())
}

pub(crate) async fn delete_player_in(
    state: &SharedState,
    game: &ParentRef,
    player_id: &str,
) -> Result<PlayerResponse, ServiceError> {
    let player: PlayerEntity = state.editor().remove(game, player_id).await?;
    Ok(player.into())
}

pub(crate) async fn adjust_score_in(
    state: &SharedState,
    game: &ParentRef,
    player_id: &str,
    payload: ScoreAdjustmentRequest,
) -> Result<PlayerResponse, ServiceError> {
    let delta = payload.delta;
    let player: PlayerEntity = state
        .editor()
        .replace_with(game, player_id, |mut player: PlayerEntity| {
            player.score = player.score.checked_add(delta).ok_or_else(|| {
                ServiceError::InvalidInput(format!("score delta {delta} overflows"))
            })?;
            Ok(player)
        })
        .await?;

    debug!(game = %game, player_id, delta, score = player.score, "score adjusted");
    Ok(player.into())
}
