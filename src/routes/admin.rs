use axum::extract::{Json, State};
use chrono::{Datelike, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DocumentStatus, Role, User};
use crate::routes::documents::{enrich_documents, DocumentResponse};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryEntry {
    id: Uuid,
    username: String,
    full_name: String,
    role: Role,
}

impl From<User> for DirectoryEntry {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectory {
    creators: Vec<DirectoryEntry>,
    approvers: Vec<DirectoryEntry>,
    issuers: Vec<DirectoryEntry>,
    admins: Vec<DirectoryEntry>,
    recipients: Vec<DirectoryEntry>,
    total: usize,
}

pub async fn user_directory(State(state): State<AppState>) -> AppResult<Json<UserDirectory>> {
    let creators: Vec<DirectoryEntry> = bucket(&state, Role::Creator).await;
    let approvers: Vec<DirectoryEntry> = bucket(&state, Role::Approver).await;
    let issuers: Vec<DirectoryEntry> = bucket(&state, Role::Issuer).await;
    let admins: Vec<DirectoryEntry> = bucket(&state, Role::Admin).await;
    let recipients: Vec<DirectoryEntry> = bucket(&state, Role::Recipient).await;
    let total =
        creators.len() + approvers.len() + issuers.len() + admins.len() + recipients.len();
    Ok(Json(UserDirectory {
        creators,
        approvers,
        issuers,
        admins,
        recipients,
        total,
    }))
}

async fn bucket(state: &AppState, role: Role) -> Vec<DirectoryEntry> {
    state
        .store
        .users_by_role(role)
        .await
        .into_iter()
        .map(DirectoryEntry::from)
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOverview {
    documents: Vec<DocumentResponse>,
    stats: Value,
}

pub async fn document_overview(
    State(state): State<AppState>,
) -> AppResult<Json<DocumentOverview>> {
    let documents = state.store.all_documents().await;
    let count = |status: DocumentStatus| documents.iter().filter(|d| d.status == status).count();
    let stats = json!({
        "total": documents.len(),
        "pending": count(DocumentStatus::Pending),
        "approved": count(DocumentStatus::Approved),
        "issued": count(DocumentStatus::Issued),
        "declined": count(DocumentStatus::Declined),
    });
    let documents = enrich_documents(&state.store, documents).await;
    Ok(Json(DocumentOverview { documents, stats }))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let documents = state.store.all_documents().await;
    let departments = state.store.list_departments().await;
    let creators = state.store.users_by_role(Role::Creator).await.len();
    let approvers = state.store.users_by_role(Role::Approver).await.len();
    let issuers = state.store.users_by_role(Role::Issuer).await.len();

    let now = Utc::now();
    let thirty_days_ago = now - Duration::days(30);
    let recent_count = documents
        .iter()
        .filter(|d| d.created_at >= thirty_days_ago)
        .count();

    let count = |status: DocumentStatus| documents.iter().filter(|d| d.status == status).count();

    let mut weekly_activity = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let day = (now - Duration::days(offset)).date_naive();
        let day_count = documents
            .iter()
            .filter(|d| d.created_at.date_naive() == day)
            .count();
        weekly_activity.push(json!({
            "day": day.weekday().to_string(),
            "documents": day_count,
        }));
    }

    let recent_documents: Vec<Value> = documents
        .iter()
        .take(10)
        .map(|d| {
            json!({
                "id": d.id,
                "docName": d.doc_name,
                "docNumber": d.doc_number,
                "status": d.status,
                "createdAt": d.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "documents": {
            "total": documents.len(),
            "pending": count(DocumentStatus::Pending),
            "approved": count(DocumentStatus::Approved),
            "issued": count(DocumentStatus::Issued),
            "declined": count(DocumentStatus::Declined),
            "recentCount": recent_count,
        },
        "users": {
            "creators": creators,
            "approvers": approvers,
            "issuers": issuers,
            "total": creators + approvers + issuers,
        },
        "departments": {
            "total": departments.len(),
            "list": departments,
        },
        "weeklyActivity": weekly_activity,
        "recentDocuments": recent_documents,
    })))
}
