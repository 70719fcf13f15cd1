use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::{
        game::{
            CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, GameResponse,
            PlayerResponse, QuestionResponse, ScoreAdjustmentRequest, UpdateGameRequest,
            UpdatePlayerRequest, UpdateQuestionRequest,
        },
        user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    },
    error::AppError,
    routes::extract::AppJson,
    services::user_service,
    state::SharedState,
};

/// User endpoints, including the games each user owns.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{user_id}/games", post(add_game))
        .route(
            "/users/{user_id}/games/{game_id}",
            put(update_game).delete(delete_game),
        )
        .route("/users/{user_id}/games/{game_id}/reset", post(reset_game))
        .route(
            "/users/{user_id}/games/{game_id}/questions",
            post(add_question),
        )
        .route(
            "/users/{user_id}/games/{game_id}/questions/{question_id}",
            put(update_question).delete(delete_question),
        )
        .route("/users/{user_id}/games/{game_id}/players", post(add_player))
        .route(
            "/users/{user_id}/games/{game_id}/players/{player_id}",
            put(update_player).delete(delete_player),
        )
        .route(
            "/users/{user_id}/games/{game_id}/players/{player_id}/score",
            post(adjust_score),
        )
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses((status = 200, description = "Stored users", body = [UserResponse]))
)]
pub async fn list_users(
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(user_service::list_users(&state).await?))
}

/// Register a user owning no games.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_user(
    State(state): State<SharedState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_service::create_user(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "Identifier of the user")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_service::get_user(&state, &user_id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "Identifier of the user")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn update_user(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(
        user_service::update_user(&state, &user_id, payload).await?,
    ))
}

/// Delete a user and every game it owns.
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "Identifier of the user")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn delete_user(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    user_service::delete_user(&state, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/games",
    tag = "users",
    params(("user_id" = String, Path, description = "Identifier of the user")),
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game appended to the user", body = GameResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn add_game(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    AppJson(payload): AppJson<CreateGameRequest>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(
        user_service::add_user_game(&state, &user_id, payload).await?,
    ))
}

/// Set the title and optionally the winner of a user's game.
#[utoipa::path(
    put,
    path = "/users/{user_id}/games/{game_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game")
    ),
    request_body = UpdateGameRequest,
    responses(
        (status = 200, description = "Game updated", body = GameResponse),
        (status = 404, description = "Unknown user or game")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Path((user_id, game_id)): Path<(String, String)>,
    AppJson(payload): AppJson<UpdateGameRequest>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(
        user_service::update_user_game(&state, &user_id, &game_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/games/{game_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game")
    ),
    responses(
        (status = 200, description = "Removed game", body = GameResponse),
        (status = 404, description = "Unknown user or game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(
        user_service::delete_user_game(&state, &user_id, &game_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/games/{game_id}/reset",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game")
    ),
    responses(
        (status = 200, description = "Game reset", body = GameResponse),
        (status = 404, description = "Unknown user or game")
    )
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(
        user_service::reset_user_game(&state, &user_id, &game_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/games/{game_id}/questions",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game")
    ),
    request_body = CreateQuestionRequest,
    responses(
        (status = 200, description = "Question appended", body = QuestionResponse),
        (status = 404, description = "Unknown user or game")
    )
)]
pub async fn add_question(
    State(state): State<SharedState>,
    Path((user_id, game_id)): Path<(String, String)>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        user_service::add_user_question(&state, &user_id, &game_id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/games/{game_id}/questions/{question_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("question_id" = String, Path, description = "Identifier of the question")
    ),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question replaced", body = QuestionResponse),
        (status = 404, description = "Unknown user, game or question")
    )
)]
pub async fn update_question(
    State(state): State<SharedState>,
    Path((user_id, game_id, question_id)): Path<(String, String, String)>,
    AppJson(payload): AppJson<UpdateQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        user_service::update_user_question(&state, &user_id, &game_id, &question_id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/games/{game_id}/questions/{question_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("question_id" = String, Path, description = "Identifier of the question")
    ),
    responses(
        (status = 200, description = "Removed question", body = QuestionResponse),
        (status = 404, description = "Unknown user, game or question")
    )
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path((user_id, game_id, question_id)): Path<(String, String, String)>,
) -> Result<Json<QuestionResponse>, AppError> {
    Ok(Json(
        user_service::delete_user_question(&state, &user_id, &game_id, &question_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/games/{game_id}/players",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game")
    ),
    request_body = CreatePlayerRequest,
    responses(
        (status = 200, description = "Player appended", body = PlayerResponse),
        (status = 404, description = "Unknown user or game")
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Path((user_id, game_id)): Path<(String, String)>,
    AppJson(payload): AppJson<CreatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        user_service::add_user_player(&state, &user_id, &game_id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/games/{game_id}/players/{player_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Player replaced", body = PlayerResponse),
        (status = 404, description = "Unknown user, game or player")
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Path((user_id, game_id, player_id)): Path<(String, String, String)>,
    AppJson(payload): AppJson<UpdatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        user_service::update_user_player(&state, &user_id, &game_id, &player_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/games/{game_id}/players/{player_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    responses(
        (status = 200, description = "Removed player", body = PlayerResponse),
        (status = 404, description = "Unknown user, game or player")
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path((user_id, game_id, player_id)): Path<(String, String, String)>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        user_service::delete_user_player(&state, &user_id, &game_id, &player_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/games/{game_id}/players/{player_id}/score",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Identifier of the user"),
        ("game_id" = String, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    request_body = ScoreAdjustmentRequest,
    responses(
        (status = 200, description = "Player with the new score", body = PlayerResponse),
        (status = 404, description = "Unknown user, game or player")
    )
)]
pub async fn adjust_score(
    State(state): State<SharedState>,
    Path((user_id, game_id, player_id)): Path<(String, String, String)>,
    AppJson(payload): AppJson<ScoreAdjustmentRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    Ok(Json(
        user_service::adjust_user_player_score(&state, &user_id, &game_id, &player_id, payload)
            .await?,
    ))
}
