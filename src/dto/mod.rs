pub mod game;
pub mod health;
pub mod user;
pub mod validation;
