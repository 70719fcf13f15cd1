//! Request and response payloads for users and the games they own.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::{
        game::GameResponse,
        validation::{MAX_LABEL_LENGTH, validate_not_blank},
    },
};

/// Payload used to register a user.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub username: String,
}

/// Replacement values for a user's scalar fields.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH), custom(function = validate_not_blank))]
    pub username: String,
}

/// User as returned by the API, embedded games included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub games: Vec<GameResponse>,
}

impl From<UserEntity> for UserResponse {
    fn from(value: UserEntity) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            games: value.games.into_iter().map(Into::into).collect(),
        }
    }
}
