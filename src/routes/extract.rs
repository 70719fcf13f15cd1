use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor rendering malformed or ill-typed payloads as
/// `400 {"error": ...}` instead of axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
