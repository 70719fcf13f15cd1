use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Family Game Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::games::list_games,
        crate::routes::games::create_game,
        crate::routes::games::get_game,
        crate::routes::games::update_game,
        crate::routes::games::delete_game,
        crate::routes::games::reset_game,
        crate::routes::games::add_question,
        crate::routes::games::update_question,
        crate::routes::games::delete_question,
        crate::routes::games::add_player,
        crate::routes::games::update_player,
        crate::routes::games::delete_player,
        crate::routes::games::adjust_score,
        crate::routes::users::list_users,
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
        crate::routes::users::add_game,
        crate::routes::users::update_game,
        crate::routes::users::delete_game,
        crate::routes::users::reset_game,
        crate::routes::users::add_question,
        crate::routes::users::update_question,
        crate::routes::users::delete_question,
        crate::routes::users::add_player,
        crate::routes::users::update_player,
        crate::routes::users::delete_player,
        crate::routes::users::adjust_score,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::UpdateGameRequest,
            crate::dto::game::CreateQuestionRequest,
            crate::dto::game::UpdateQuestionRequest,
            crate::dto::game::CreatePlayerRequest,
            crate::dto::game::UpdatePlayerRequest,
            crate::dto::game::ScoreAdjustmentRequest,
            crate::dto::game::GameResponse,
            crate::dto::game::QuestionResponse,
            crate::dto::game::PlayerResponse,
            crate::dto::user::CreateUserRequest,
            crate::dto::user::UpdateUserRequest,
            crate::dto::user::UserResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game lifecycle"),
        (name = "questions", description = "Questions embedded in a game"),
        (name = "players", description = "Players embedded in a game"),
        (name = "users", description = "Users and the games they own"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/games/{game_id}/players/{player_id}/score",
            "/users/{user_id}/games/{game_id}/questions/{question_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
