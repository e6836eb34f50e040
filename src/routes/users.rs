use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Role, User};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub full_name: String,
    pub master_copy_access: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            master_copy_access: user.master_copy_access,
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let role = params
        .role
        .ok_or_else(|| AppError::bad_request("role query parameter is required"))?;
    let users = state.store.users_by_role(role).await;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    if payload.full_name.trim().is_empty() {
        return Err(AppError::bad_request("fullName must not be empty"));
    }
    let user = state.store.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.store.delete_user(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}
