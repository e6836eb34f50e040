use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::MAX_UPLOAD_BYTES;
use crate::error::{AppError, AppResult};
use crate::models::{CopyAction, Department, Document, DocumentStatus, Role, User};
use crate::render::ControlCopyStamp;
use crate::state::AppState;
use crate::store::EntityStore;
use crate::workflow::{self, ApproveInput, IssueInput, SubmitInput, Transition};
use crate::{render, versions};

const ALLOWED_SOURCE_MIMES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListQuery {
    pub status: Option<DocumentStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueForReviewQuery {
    pub days_ahead: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfQuery {
    pub user_id: Option<Uuid>,
    pub version: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub approval_remarks: String,
    pub approved_by: Uuid,
    pub approver_name: Option<String>,
    #[serde(default)]
    pub departments: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    pub decline_remarks: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub issued_by: Uuid,
    pub issuer_name: String,
    pub remarks: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintRequest {
    pub user_id: Option<Uuid>,
    pub version: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub preparer_name: String,
    pub approver_name: Option<String>,
    pub departments: Vec<Department>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub base: DocumentResponse,
    pub previous_version: Option<Document>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueForReviewEntry {
    #[serde(flatten)]
    pub base: DocumentResponse,
    pub days_until_due: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub doc_name: String,
    pub doc_number: String,
    pub revision_no: i32,
    pub paragraphs: Vec<String>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let docs = match (params.status, params.user_id) {
        (Some(status), _) => state.store.documents_by_status(status).await,
        (None, Some(user_id)) => state.store.documents_by_user(user_id).await,
        (None, None) => {
            return Err(AppError::bad_request(
                "status or userId query parameter is required",
            ))
        }
    };
    Ok(Json(enrich_documents(&state.store, docs).await))
}

pub async fn due_for_review(
    State(state): State<AppState>,
    Query(params): Query<DueForReviewQuery>,
) -> AppResult<Json<Vec<DueForReviewEntry>>> {
    let days_ahead = params.days_ahead.unwrap_or(30);
    if days_ahead < 0 {
        return Err(AppError::bad_request("invalid daysAhead parameter"));
    }

    let now = Utc::now();
    let cutoff = now + Duration::days(days_ahead);
    let issued = state.store.documents_by_status(DocumentStatus::Issued).await;

    let mut entries = Vec::new();
    for doc in issued {
        let Some(due) = doc.review_due_date else {
            continue;
        };
        if due > cutoff {
            continue;
        }
        let days_until_due = ((due - now).num_seconds() as f64 / 86_400.0).ceil() as i64;
        let base = enrich_document(&state.store, doc).await;
        entries.push(DueForReviewEntry {
            base,
            days_until_due,
        });
    }
    entries.sort_by_key(|entry| entry.days_until_due);
    Ok(Json(entries))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let document = require_document(&state.store, id).await?;
    let previous_version = match document.previous_version_id {
        Some(previous_id) => state.store.get_document(previous_id).await,
        None => None,
    };
    let base = enrich_document(&state.store, document).await;
    Ok(Json(DocumentDetailResponse {
        base,
        previous_version,
    }))
}

struct UploadFields {
    bytes: Vec<u8>,
    original_name: String,
    content_type: Option<String>,
    doc_name: Option<String>,
    doc_number: Option<String>,
    revision_no: i32,
    prepared_by: Option<Uuid>,
    date_of_issue: Option<DateTime<Utc>>,
    due_period_years: Option<i32>,
    reason_for_revision: Option<String>,
}

async fn collect_upload(multipart: &mut Multipart) -> AppResult<UploadFields> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut doc_name = None;
    let mut doc_number = None;
    let mut revision_no = 0;
    let mut prepared_by = None;
    let mut date_of_issue = None;
    let mut due_period_years = None;
    let mut reason_for_revision = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                original_name = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                bytes = Some(data.to_vec());
            }
            Some(other) => {
                let value = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid field '{other}': {err}"))
                })?;
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match other {
                    "docName" => doc_name = Some(value.to_string()),
                    "docNumber" => doc_number = Some(value.to_string()),
                    "revisionNo" => {
                        revision_no = value.parse().map_err(|_| {
                            AppError::bad_request("revisionNo must be an integer")
                        })?;
                    }
                    "preparedBy" => {
                        prepared_by = Some(Uuid::parse_str(value).map_err(|_| {
                            AppError::bad_request("preparedBy must be a valid UUID")
                        })?);
                    }
                    "dateOfIssue" => date_of_issue = Some(parse_date_field(value)?),
                    "duePeriodYears" => {
                        due_period_years = Some(value.parse().map_err(|_| {
                            AppError::bad_request("duePeriodYears must be an integer")
                        })?);
                    }
                    "reasonForRevision" => reason_for_revision = Some(value.to_string()),
                    _ => {}
                }
            }
            None => {}
        }
    }

    let bytes = bytes.ok_or_else(|| {
        error!("upload rejected: missing file field");
        AppError::bad_request("Word document file is required")
    })?;
    let original_name = original_name
        .ok_or_else(|| AppError::bad_request("uploaded file must carry a filename"))?;

    validate_source_file(&bytes, &original_name, content_type.as_deref())?;

    Ok(UploadFields {
        bytes,
        original_name,
        content_type,
        doc_name,
        doc_number,
        revision_no,
        prepared_by,
        date_of_issue,
        due_period_years,
        reason_for_revision,
    })
}

fn validate_source_file(
    bytes: &[u8],
    original_name: &str,
    content_type: Option<&str>,
) -> AppResult<()> {
    if bytes.is_empty() {
        return Err(AppError::bad_request("uploaded file must not be empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::bad_request("file size must be less than 10MB"));
    }
    let mime = match content_type {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(original_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    };
    if !ALLOWED_SOURCE_MIMES.contains(&mime.as_str()) {
        return Err(AppError::bad_request(
            "only Word documents (.doc, .docx) are allowed",
        ));
    }
    Ok(())
}

fn parse_date_field(value: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(parsed) = value.parse::<DateTime<Utc>>() {
        return Ok(parsed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(AppError::bad_request(format!("invalid date value '{value}'")))
}

/// Stores the source bytes and returns the key and checksum recorded on the
/// document row.
async fn store_source_file(
    state: &AppState,
    bytes: &[u8],
    original_name: &str,
) -> AppResult<(String, String)> {
    let checksum = hex::encode(Sha256::digest(bytes));
    let key = format!("{}_{}", Uuid::new_v4(), original_name);
    state
        .uploads
        .put(&key, bytes.to_vec())
        .await
        .map_err(|err| {
            error!(error = %err, key = %key, "failed to store uploaded source");
            AppError::internal(format!("failed to store uploaded file: {err}"))
        })?;
    Ok((key, checksum))
}

pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let fields = collect_upload(&mut multipart).await?;

    let doc_name = fields
        .doc_name
        .clone()
        .ok_or_else(|| AppError::bad_request("docName is required"))?;
    let doc_number = fields
        .doc_number
        .clone()
        .ok_or_else(|| AppError::bad_request("docNumber is required"))?;
    let prepared_by = fields
        .prepared_by
        .ok_or_else(|| AppError::bad_request("preparedBy is required"))?;
    if state.store.get_user(prepared_by).await.is_none() {
        return Err(AppError::bad_request(
            "preparedBy must reference an existing user",
        ));
    }

    let (header_info, footer_info) = extract_header_footer(&fields.bytes);
    let (source_key, checksum) =
        store_source_file(&state, &fields.bytes, &fields.original_name).await?;

    let document = workflow::submit(
        &state.store,
        SubmitInput {
            doc_name,
            doc_number,
            revision_no: fields.revision_no,
            prepared_by,
            date_of_issue: fields.date_of_issue,
            due_period_years: fields.due_period_years,
            reason_for_revision: fields.reason_for_revision,
            header_info: Some(header_info),
            footer_info: Some(footer_info),
            previous_version_id: None,
            source_file_path: Some(source_key),
            source_checksum: Some(checksum),
        },
    )
    .await?;

    info!(
        document_id = %document.id,
        doc_number = %document.doc_number,
        original_name = %fields.original_name,
        content_type = ?fields.content_type,
        "document upload succeeded"
    );

    let response = enrich_document(&state.store, document).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Resubmission of a declined document: a fresh source file becomes a new
/// pending revision chained to the declined row.
pub async fn resubmit_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let declined = require_document(&state.store, id).await?;
    // reject before the replacement file lands in storage
    if !declined.status.permits(Transition::Resubmit) {
        return Err(AppError::invalid_transition(
            declined.status,
            Transition::Resubmit,
        ));
    }
    let fields = collect_upload(&mut multipart).await?;

    let (header_info, footer_info) = extract_header_footer(&fields.bytes);
    let (source_key, checksum) =
        store_source_file(&state, &fields.bytes, &fields.original_name).await?;

    let document = workflow::resubmit(
        &state.store,
        id,
        SubmitInput {
            doc_name: fields.doc_name.unwrap_or_else(|| declined.doc_name.clone()),
            doc_number: declined.doc_number.clone(),
            revision_no: 0,
            prepared_by: fields.prepared_by.unwrap_or(declined.prepared_by),
            date_of_issue: fields.date_of_issue,
            due_period_years: fields.due_period_years.or(declined.due_period_years),
            reason_for_revision: fields.reason_for_revision,
            header_info: Some(header_info),
            footer_info: Some(footer_info),
            previous_version_id: None,
            source_file_path: Some(source_key),
            source_checksum: Some(checksum),
        },
    )
    .await?;

    let response = enrich_document(&state.store, document).await;
    Ok((StatusCode::CREATED, Json(response)))
}

fn extract_header_footer(bytes: &[u8]) -> (String, String) {
    match render::docx::extract_paragraphs(bytes) {
        Ok(paragraphs) => render::docx::derive_header_footer(&paragraphs),
        Err(err) => {
            warn!(error = %err, "header/footer extraction failed, using placeholders");
            ("Document Header".to_string(), "Document Footer".to_string())
        }
    }
}

pub async fn approve_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = workflow::approve(
        &state.store,
        id,
        ApproveInput {
            approved_by: payload.approved_by,
            approver_name: payload.approver_name,
            approval_remarks: payload.approval_remarks,
            departments: payload.departments,
        },
    )
    .await?;
    Ok(Json(enrich_document(&state.store, document).await))
}

pub async fn decline_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeclineRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = workflow::decline(&state.store, id, payload.decline_remarks).await?;
    Ok(Json(enrich_document(&state.store, document).await))
}

pub async fn issue_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = workflow::issue(
        &state.store,
        id,
        IssueInput {
            issued_by: payload.issued_by,
            issuer_name: payload.issuer_name,
            remarks: payload.remarks,
        },
    )
    .await?;
    Ok(Json(enrich_document(&state.store, document).await))
}

pub async fn document_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PdfQuery>,
) -> AppResult<Response> {
    let user_id = params
        .user_id
        .ok_or_else(|| AppError::bad_request("userId query parameter is required"))?;
    let user = require_user(&state.store, user_id).await?;
    let document = require_document(&state.store, id).await?;

    let resolved = versions::resolve_accessible_revision(
        &state.store,
        &document.doc_number,
        params.version,
        &user,
    )
    .await?;

    render_controlled_copy(&state, resolved, &user, CopyAction::View).await
}

pub async fn print_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrintRequest>,
) -> AppResult<Response> {
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::bad_request("userId is required"))?;
    let user = require_user(&state.store, user_id).await?;
    let document = require_document(&state.store, id).await?;

    let resolved = versions::resolve_accessible_revision(
        &state.store,
        &document.doc_number,
        payload.version,
        &user,
    )
    .await?;

    render_controlled_copy(&state, resolved, &user, CopyAction::Print).await
}

/// Both PDF paths run through here: resolve already happened, so issue the
/// control copy, render with the stamp, persist the artifact, stream the
/// bytes.
async fn render_controlled_copy(
    state: &AppState,
    document: Document,
    user: &User,
    action: CopyAction,
) -> AppResult<Response> {
    let source_key = document
        .source_file_path
        .clone()
        .ok_or_else(|| AppError::not_found("no Word file uploaded for this document"))?;
    let source = state.uploads.get(&source_key).await.map_err(|err| {
        error!(error = %err, document_id = %document.id, "source file missing on server");
        AppError::not_found("Word file not found on server")
    })?;

    let copy = state
        .store
        .issue_control_copy(document.id, user.id, action)
        .await?;
    let stamp = ControlCopyStamp {
        user_id: user.id,
        user_name: user.full_name.clone(),
        copy_number: copy.copy_number,
        date: Utc::now().format("%Y-%m-%d").to_string(),
    };

    let bytes = state
        .renderer
        .render_to_pdf(&document, source, Some(stamp))
        .await
        .map_err(|err| {
            error!(
                error = %err,
                document_id = %document.id,
                user_id = %user.id,
                action = %action,
                "controlled copy rendering failed"
            );
            err
        })?;

    let artifact_key = format!(
        "{}_v{}_cc{}.pdf",
        document.doc_number, document.revision_no, copy.copy_number
    );
    if let Err(err) = state.artifacts.put(&artifact_key, bytes.clone()).await {
        // the artifact is derived data; losing the cached copy is not fatal
        warn!(error = %err, key = %artifact_key, "failed to persist rendered artifact");
    } else {
        state.store.set_pdf_path(document.id, &artifact_key).await?;
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn view_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserQuery>,
) -> AppResult<Json<ViewResponse>> {
    let user_id = params
        .user_id
        .ok_or_else(|| AppError::bad_request("userId query parameter is required"))?;
    let user = require_user(&state.store, user_id).await?;
    if user.role == Role::Recipient {
        return Err(AppError::access_denied(
            "recipients may only view issued controlled copies",
        ));
    }

    let document = require_document(&state.store, id).await?;
    let source_key = document
        .source_file_path
        .clone()
        .ok_or_else(|| AppError::not_found("no Word file uploaded for this document"))?;
    let source = state
        .uploads
        .get(&source_key)
        .await
        .map_err(|_| AppError::not_found("Word file not found on server"))?;

    let paragraphs = state.renderer.render_for_viewing(&source)?;
    Ok(Json(ViewResponse {
        doc_name: document.doc_name,
        doc_number: document.doc_number,
        revision_no: document.revision_no,
        paragraphs,
    }))
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let document = require_document(&state.store, id).await?;
    let source_key = document
        .source_file_path
        .clone()
        .ok_or_else(|| AppError::not_found("no Word file available for this document"))?;
    let source = state
        .uploads
        .get(&source_key)
        .await
        .map_err(|_| AppError::not_found("Word file not found on server"))?;

    let filename = original_filename(&source_key);
    let disposition = attachment_content_disposition(filename);
    Ok((
        [
            (
                header::CONTENT_TYPE,
                ALLOWED_SOURCE_MIMES[0].to_string(),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        source,
    )
        .into_response())
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(doc_number): Path<String>,
    Query(params): Query<UserQuery>,
) -> AppResult<Json<Vec<Document>>> {
    let user_id = params
        .user_id
        .ok_or_else(|| AppError::bad_request("userId query parameter is required"))?;
    let user = require_user(&state.store, user_id).await?;
    let revisions = versions::accessible_versions(&state.store, &doc_number, &user).await?;
    Ok(Json(revisions))
}

// ----- shared helpers -----

pub(crate) async fn require_document(store: &EntityStore, id: Uuid) -> AppResult<Document> {
    store
        .get_document(id)
        .await
        .ok_or_else(|| AppError::not_found("document not found"))
}

pub(crate) async fn require_user(store: &EntityStore, id: Uuid) -> AppResult<User> {
    store
        .get_user(id)
        .await
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub(crate) async fn enrich_document(store: &EntityStore, document: Document) -> DocumentResponse {
    let preparer_name = match store.get_user(document.prepared_by).await {
        Some(user) => user.full_name,
        None => "Unknown".to_string(),
    };
    let approver_name = match document.approved_by {
        Some(approver_id) => store.get_user(approver_id).await.map(|u| u.full_name),
        None => None,
    };
    let departments = store.document_departments(document.id).await;
    DocumentResponse {
        document,
        preparer_name,
        approver_name,
        departments,
    }
}

pub(crate) async fn enrich_documents(
    store: &EntityStore,
    documents: Vec<Document>,
) -> Vec<DocumentResponse> {
    let mut response = Vec::with_capacity(documents.len());
    for document in documents {
        response.push(enrich_document(store, document).await);
    }
    response
}

/// Source keys are `{uuid}_{original filename}`.
fn original_filename(source_key: &str) -> &str {
    source_key
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(source_key)
}

fn attachment_content_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();
    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}
