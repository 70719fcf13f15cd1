//! Business logic behind the `/users` routes. A user owns a list of games; each
//! nested game is resolved with [`CollectionEditor::child`] and then edited with
//! the same helpers as top-level games.
//!
//! [`CollectionEditor::child`]: crate::services::collection_editor::CollectionEditor::child

use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::{
        document_store::FieldPath,
        models::{GameEntity, USER_KEY, UserEntity, decode, encode},
    },
    dto::{
        game::{
            CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, GameResponse,
            PlayerResponse, QuestionResponse, ScoreAdjustmentRequest, UpdateGameRequest,
            UpdatePlayerRequest, UpdateQuestionRequest,
        },
        user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    },
    error::ServiceError,
    services::{collection_editor::ParentRef, game_service},
    state::SharedState,
};

fn user_ref(state: &SharedState, user_id: &str) -> ParentRef {
    ParentRef::document("user", &state.tables().users, user_id)
}

/// Resolve a game nested in a user document.
async fn user_game_ref(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
) -> Result<ParentRef, ServiceError> {
    state
        .editor()
        .child::<GameEntity>(&user_ref(state, user_id), game_id)
        .await
}

/// Return every stored user.
pub async fn list_users(state: &SharedState) -> Result<Vec<UserResponse>, ServiceError> {
    let table = &state.tables().users;
    let documents = state.store().scan(table).await?;

    documents
        .into_iter()
        .map(|document| -> Result<UserResponse, ServiceError> {
            let key = document
                .get(USER_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let user: UserEntity = decode(table, &key, document)?;
            Ok(user.into())
        })
        .collect()
}

pub async fn get_user(state: &SharedState, user_id: &str) -> Result<UserResponse, ServiceError> {
    let table = &state.tables().users;
    let document = state
        .store()
        .get_document(table, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))?;

    let user: UserEntity = decode(table, user_id, document)?;
    Ok(user.into())
}

/// Register a user owning no games.
pub async fn create_user(
    state: &SharedState,
    payload: CreateUserRequest,
) -> Result<UserResponse, ServiceError> {
    payload.validate()?;

    let user = UserEntity {
        user_id: state.editor().generate_id(),
        username: payload.username,
        games: Vec::new(),
    };
    state
        .store()
        .put_document(&state.tables().users, &user.user_id, encode(&user)?)
        .await?;

    info!(user_id = %user.user_id, "user created");
    Ok(user.into())
}

pub async fn update_user(
    state: &SharedState,
    user_id: &str,
    payload: UpdateUserRequest,
) -> Result<UserResponse, ServiceError> {
    payload.validate()?;

    let table = &state.tables().users;
    let document = state
        .store()
        .update_field(
            table,
            user_id,
            FieldPath::field("username"),
            Value::String(payload.username),
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))?;

    debug!(user_id, "user updated");
    let user: UserEntity = decode(table, user_id, document)?;
    Ok(user.into())
}

/// Delete a user together with every game it owns.
pub async fn delete_user(state: &SharedState, user_id: &str) -> Result<(), ServiceError> {
    let deleted = state
        .store()
        .delete_document(&state.tables().users, user_id)
        .await?;

    if !deleted {
        return Err(ServiceError::NotFound(format!("user `{user_id}` not found")));
    }

    info!(user_id, "user deleted");
    Ok(())
}

pub async fn add_user_game(
    state: &SharedState,
    user_id: &str,
    payload: CreateGameRequest,
) -> Result<GameResponse, ServiceError> {
    let game: GameEntity = state
        .editor()
        .append(&user_ref(state, user_id), payload)
        .await?;
    Ok(game.into())
}

/// Update a nested game's title and winner; its lists are preserved.
pub async fn update_user_game(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    payload: UpdateGameRequest,
) -> Result<GameResponse, ServiceError> {
    let game: GameEntity = state
        .editor()
        .replace(&user_ref(state, user_id), game_id, payload)
        .await?;
    Ok(game.into())
}

pub async fn delete_user_game(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
) -> Result<GameResponse, ServiceError> {
    let game: GameEntity = state
        .editor()
        .remove(&user_ref(state, user_id), game_id)
        .await?;
    Ok(game.into())
}

pub async fn reset_user_game(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
) -> Result<GameResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::reset_game_in(state, &game).await
}

pub async fn add_user_question(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    payload: CreateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::add_question_in(state, &game, payload).await
}

pub async fn update_user_question(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    question_id: &str,
    payload: UpdateQuestionRequest,
) -> Result<QuestionResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::update_question_in(state, &game, question_id, payload).await
}

pub async fn delete_user_question(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    question_id: &str,
) -> Result<QuestionResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::delete_question_in(state, &game, question_id).await
}

pub async fn add_user_player(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    payload: CreatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::add_player_in(state, &game, payload).await
}

pub async fn update_user_player(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    player_id: &str,
    payload: UpdatePlayerRequest,
) -> Result<PlayerResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::update_player_in(state, &game, player_id, payload).await
}

pub async fn delete_user_player(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    player_id: &str,
) -> Result<PlayerResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::delete_player_in(state, &game, player_id).await
}

pub async fn adjust_user_player_score(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    player_id: &str,
    payload: ScoreAdjustmentRequest,
) -> Result<PlayerResponse, ServiceError> {
    let game = user_game_ref(state, user_id, game_id).await?;
    game_service::adjust_score_in(state, &game, player_id, payload).await
}
