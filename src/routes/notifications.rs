use axum::extract::{Json, Path, State};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;
use crate::state::AppState;

pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.store.notifications_for_user(user_id).await))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.store.mark_notification_read(id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}
