/// Generic editing of lists embedded in a parent document.
pub(crate) mod collection_editor;
/// OpenAPI documentation generation.
pub mod documentation;
/// Games and their embedded questions and players.
pub(crate) mod game_service;
/// Health check service.
pub(crate) mod health_service;
/// Users and the games nested in them.
pub(crate) mod user_service;
