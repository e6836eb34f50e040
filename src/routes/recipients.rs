use axum::extract::{Json, Path, State};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Document;
use crate::state::AppState;

/// Issued documents individually granted to a recipient user.
pub async fn accessible_documents(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.store.accessible_documents_for_user(user_id).await))
}
