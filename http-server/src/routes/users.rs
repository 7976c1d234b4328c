use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{bad_request, ErrorResponse};
use crate::models::Account;
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

// Register endpoint: idempotent per email
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Account>), (StatusCode, Json<ErrorResponse>)> {
    if payload.email.is_empty() {
        return Err(bad_request("email is required"));
    }

    let account = state.accounts.get_or_create(&payload.email);
    tracing::info!(user_id = account.user_id, email = %account.email, "registered user");
    Ok((StatusCode::CREATED, Json(account)))
}

// Account lookup, including current balances
pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<Account>, (StatusCode, Json<ErrorResponse>)> {
    match state.accounts.get_by_user_id(user_id) {
        Some(account) => Ok(Json(account)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("user not found: {user_id}"),
            }),
        )),
    }
}
