use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Department, NewDepartment};
use crate::state::AppState;

pub async fn list_departments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Department>>> {
    Ok(Json(state.store.list_departments().await))
}

pub async fn create_department(
    State(state): State<AppState>,
    Json(payload): Json<NewDepartment>,
) -> AppResult<(StatusCode, Json<Department>)> {
    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Err(AppError::bad_request("name and code must not be empty"));
    }
    let department = state.store.create_department(payload).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.store.delete_department(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Department deleted successfully"
    })))
}
