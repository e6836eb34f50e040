use axum::extract::{Json, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ControlCopy, PrintLog};
use crate::state::AppState;
use crate::store::EntityStore;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub document_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintLogReport {
    #[serde(flatten)]
    pub log: PrintLog,
    pub document_name: String,
    pub document_number: String,
    pub user_name: String,
    pub user_email: String,
    pub control_copy_number: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCopyReport {
    #[serde(flatten)]
    pub copy: ControlCopy,
    pub document_name: String,
    pub document_number: String,
    pub user_name: String,
    pub user_email: String,
}

pub async fn print_logs(
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> AppResult<Json<Vec<PrintLogReport>>> {
    let logs = match (params.document_id, params.user_id) {
        (Some(document_id), _) => state.store.print_logs_by_document(document_id).await,
        (None, Some(user_id)) => state.store.print_logs_by_user(user_id).await,
        (None, None) => {
            return Err(AppError::bad_request(
                "documentId or userId query parameter is required",
            ))
        }
    };

    let mut reports = Vec::with_capacity(logs.len());
    for log in logs {
        let (document_name, document_number) = document_display(&state.store, log.document_id).await;
        let (user_name, user_email) = user_display(&state.store, log.user_id).await;
        let control_copy_number = state
            .store
            .get_control_copy(log.control_copy_id)
            .await
            .map(|c| c.copy_number)
            .unwrap_or(0);
        reports.push(PrintLogReport {
            log,
            document_name,
            document_number,
            user_name,
            user_email,
            control_copy_number,
        });
    }
    Ok(Json(reports))
}

pub async fn control_copies(
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> AppResult<Json<Vec<ControlCopyReport>>> {
    let copies = match (params.document_id, params.user_id) {
        (Some(document_id), _) => state.store.control_copies_by_document(document_id).await,
        (None, Some(user_id)) => state.store.control_copies_by_user(user_id).await,
        (None, None) => {
            return Err(AppError::bad_request(
                "documentId or userId query parameter is required",
            ))
        }
    };

    let mut reports = Vec::with_capacity(copies.len());
    for copy in copies {
        let (document_name, document_number) =
            document_display(&state.store, copy.document_id).await;
        let (user_name, user_email) = user_display(&state.store, copy.user_id).await;
        reports.push(ControlCopyReport {
            copy,
            document_name,
            document_number,
            user_name,
            user_email,
        });
    }
    Ok(Json(reports))
}

async fn document_display(store: &EntityStore, document_id: Uuid) -> (String, String) {
    match store.get_document(document_id).await {
        Some(doc) => (doc.doc_name, doc.doc_number),
        None => ("Unknown".to_string(), "Unknown".to_string()),
    }
}

async fn user_display(store: &EntityStore, user_id: Uuid) -> (String, String) {
    match store.get_user(user_id).await {
        Some(user) => (user.full_name, user.username),
        None => ("Unknown".to_string(), "Unknown".to_string()),
    }
}
