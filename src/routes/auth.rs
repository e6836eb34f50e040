use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub full_name: String,
}

/// Plaintext credential lookup. There are no sessions or tokens; the client
/// carries the returned user id on subsequent requests.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (Some(username), Some(password)) = (payload.username, payload.password) else {
        return Err(AppError::bad_request("username and password are required"));
    };

    let user = state
        .store
        .get_user_by_username(&username)
        .await
        .filter(|user| user.password == password)
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(LoginResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        full_name: user.full_name,
    }))
}
