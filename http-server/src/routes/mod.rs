use axum::http::StatusCode;
use axum::Json;
use clob::EngineError;
use serde::Serialize;

pub mod markets;
pub mod orders;
pub mod users;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps engine errors onto HTTP statuses: validation and precondition
/// failures are the client's problem, a poisoned book is ours.
pub(crate) fn reject(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
