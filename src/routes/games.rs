use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::game::{
        CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, GameResponse,
        PlayerResponse, QuestionResponse, ScoreAdjustmentRequest, UpdateGameRequest,
        UpdatePlayerRequest, UpdateQuestionRequest,
    },
    error::AppError,
    routes::extract::AppJson,
    services::game_service,
    state::SharedState,
};

/// Game management endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route(
            "/games/{game_id}",
            get(get_game).put(update_game).delete(delete_game),
        )
        .route("/games/{game_id}/reset", post(reset_game))
        .route("/games/{game_id}/questions", post(add_question))
        .route(
            "/games/{game_id}/questions/{question_id}",
            put(update_question).delete(delete_question),
        )
        .route("/games/{game_id}/players", post(add_player))
        .route(
            "/games/{game_id}/players/{player_id}",
            put(update_player).delete(delete_player),
        )
        .route(
            "/games/{game_id}/players/{player_id}/score",
            post(adjust_score),
        )
}

/// List every stored game.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Stored games", body = [GameResponse]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameResponse>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Create a game with no questions, no players and no winner.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameResponse),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    AppJson(payload): AppJson<CreateGameRequest>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(game_service::create_game(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/games/{game_id}",
    tag = "games",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game", body = GameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(game_service::get_game(&state, &game_id).await?))
}

/// Set the title and optionally the winner of a game.
#[utoipa::path(
    put,
    path = "/games/{game_id}",
    tag = "games",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    request_body = UpdateGameRequest,
    responses(
        (status = 200, description = "Game updated", body = GameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    AppJson(payload): AppJson<UpdateGameRequest>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(
        game_service::update_game(&state, &game_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/games/{game_id}",
    tag = "games",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, &game_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Zero every score, clear every asked flag and the winner.
#[utoipa::path(
    post,
    path = "/games/{game_id}/reset",
    tag = "games",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game reset", body = GameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(game_service::reset_game(&state, &game_id).await?))
}

#[utoipa::path(
    post,
    path = "/games/{game_id}/questions",
    tag = "questions",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    request_body = CreateQuestionRequest,
    responses(
        (status = 200, description = "Question appended", body = QuestionResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn add_question(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        game_service::add_question(&state, &game_id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/games/{game_id}/questions/{question_id}",
    tag = "questions",
    params(
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("question_id" = String, Path, description = "Identifier of the question")
    ),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question replaced", body = QuestionResponse),
        (status = 404, description = "Unknown game or question")
    )
)]
pub async fn update_question(
    State(state): State<SharedState>,
    Path((game_id, question_id)): Path<(String, String)>,
    AppJson(payload): AppJson<UpdateQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        game_service::update_question(&state, &game_id, &question_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/games/{game_id}/questions/{question_id}",
    tag = "questions",
    params(
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("question_id" = String, Path, description = "Identifier of the question")
    ),
    responses(
        (status = 200, description = "Removed question", body = QuestionResponse),
        (status = 404, description = "Unknown game or question")
    )
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path((game_id, question_id)): Path<(String, String)>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        game_service::delete_question(&state, &game_id, &question_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/games/{game_id}/players",
    tag = "players",
    params(("game_id" = String, Path, description = "Identifier of the game")),
    request_body = CreatePlayerRequest,
    responses(
        (status = 200, description = "Player appended", body = PlayerResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    AppJson(payload): AppJson<CreatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(game_service::add_player(&state, &game_id, payload).await?))
}

#[utoipa::path(
    put,
    path = "/games/{game_id}/players/{player_id}",
    tag = "players",
    params(
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Player replaced", body = PlayerResponse),
        (status = 404, description = "Unknown game or player")
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(String, String)>,
    AppJson(payload): AppJson<UpdatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        game_service::update_player(&state, &game_id, &player_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/games/{game_id}/players/{player_id}",
    tag = "players",
    params(
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    responses(
        (status = 200, description = "Removed player", body = PlayerResponse),
        (status = 404, description = "Unknown game or player")
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(String, String)>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        game_service::delete_player(&state, &game_id, &player_id).await?,
    ))
}

/// Add a signed delta to a player's score.
#[utoipa::path(
    post,
    path = "/games/{game_id}/players/{player_id}/score",
    tag = "players",
    params(
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    request_body = ScoreAdjustmentRequest,
    responses(
        (status = 200, description = "Player with the new score", body = PlayerResponse),
        (status = 404, description = "Unknown game or player")
    )
)]
pub async fn adjust_score(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(String, String)>,
    AppJson(payload): AppJson<ScoreAdjustmentRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        game_service::adjust_score(&state, &game_id, &player_id, payload).await?,
    ))
}
