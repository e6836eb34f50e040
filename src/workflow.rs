//! Document workflow engine: the status state machine and the side effects
//! each transition fans out (notifications, department assignment, recipient
//! rows). Every transition goes through the store's conditional update, so a
//! request racing a concurrent transition loses with a conflict instead of
//! silently re-applying.

use chrono::{DateTime, Months, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentStatus, NewDocument, Role};
use crate::notify;
use crate::store::{EntityStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Decline,
    Issue,
    Resubmit,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Approve => f.write_str("approve"),
            Transition::Decline => f.write_str("decline"),
            Transition::Issue => f.write_str("issue"),
            Transition::Resubmit => f.write_str("resubmit"),
        }
    }
}

impl DocumentStatus {
    /// The transition table: pending -> {approved, declined},
    /// approved -> {issued, declined}. Declined rows admit resubmission,
    /// which creates a new revision rather than reopening the row. Issued
    /// is terminal.
    pub fn permits(self, transition: Transition) -> bool {
        matches!(
            (self, transition),
            (DocumentStatus::Pending, Transition::Approve)
                | (DocumentStatus::Pending, Transition::Decline)
                | (DocumentStatus::Approved, Transition::Issue)
                | (DocumentStatus::Approved, Transition::Decline)
                | (DocumentStatus::Declined, Transition::Resubmit)
        )
    }
}

#[derive(Debug, Clone)]
pub struct SubmitInput {
    pub doc_name: String,
    pub doc_number: String,
    pub revision_no: i32,
    pub prepared_by: Uuid,
    pub date_of_issue: Option<DateTime<Utc>>,
    pub due_period_years: Option<i32>,
    pub reason_for_revision: Option<String>,
    pub header_info: Option<String>,
    pub footer_info: Option<String>,
    pub previous_version_id: Option<Uuid>,
    pub source_file_path: Option<String>,
    pub source_checksum: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApproveInput {
    pub approved_by: Uuid,
    pub approver_name: Option<String>,
    pub approval_remarks: String,
    pub departments: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct IssueInput {
    pub issued_by: Uuid,
    pub issuer_name: String,
    pub remarks: Option<String>,
}

/// The review-due date tracks the issue date plus the due period.
pub fn review_due_date(
    date_of_issue: DateTime<Utc>,
    due_period_years: Option<i32>,
) -> Option<DateTime<Utc>> {
    match due_period_years {
        Some(years) if years > 0 => date_of_issue.checked_add_months(Months::new(years as u32 * 12)),
        _ => None,
    }
}

/// Creates the pending document and notifies every approver.
pub async fn submit(store: &EntityStore, input: SubmitInput) -> AppResult<Document> {
    let date_of_issue = input.date_of_issue.unwrap_or_else(Utc::now);
    let document = store
        .create_document(NewDocument {
            doc_name: input.doc_name,
            doc_number: input.doc_number,
            revision_no: input.revision_no,
            prepared_by: input.prepared_by,
            date_of_issue: Some(date_of_issue),
            due_period_years: input.due_period_years,
            reason_for_revision: input.reason_for_revision,
            review_due_date: review_due_date(date_of_issue, input.due_period_years),
            header_info: input.header_info,
            footer_info: input.footer_info,
            previous_version_id: input.previous_version_id,
            source_file_path: input.source_file_path,
            source_checksum: input.source_checksum,
        })
        .await?;

    let approvers = store.users_by_role(Role::Approver).await;
    let message = format!(
        "New document \"{}\" ({}) is ready for your approval",
        document.doc_name, document.doc_number
    );
    notify_all_ids(store, &approvers, document.id, &message, notify::KIND_NEW_DOCUMENT).await?;

    info!(document_id = %document.id, doc_number = %document.doc_number, "document submitted");
    Ok(document)
}

/// pending -> approved. Assigns departments when given and notifies every
/// issuer plus the preparer.
pub async fn approve(store: &EntityStore, id: Uuid, input: ApproveInput) -> AppResult<Document> {
    let document = require_document(store, id).await?;
    ensure_permitted(&document, Transition::Approve)?;

    let approver_name = match input.approver_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => match store.get_user(input.approved_by).await {
            Some(user) => user.full_name,
            None => "Unknown".to_string(),
        },
    };

    let approved_by = input.approved_by;
    let remarks = input.approval_remarks.clone();
    let updated = store
        .transition_document(id, DocumentStatus::Pending, |doc| {
            doc.status = DocumentStatus::Approved;
            doc.approved_by = Some(approved_by);
            doc.approval_remarks = Some(remarks);
            doc.approved_at = Some(Utc::now());
        })
        .await
        .map_err(|err| conflict_to_transition(err, Transition::Approve))?;

    if !input.departments.is_empty() {
        store
            .assign_document_departments(id, &input.departments)
            .await?;
    }

    let issuers = store.users_by_role(Role::Issuer).await;
    let issuer_message = format!(
        "Document \"{}\" ({}) has been approved by {}. Remarks: \"{}\"",
        updated.doc_name, updated.doc_number, approver_name, input.approval_remarks
    );
    notify_all_ids(
        store,
        &issuers,
        id,
        &issuer_message,
        notify::KIND_APPROVED_DOCUMENT,
    )
    .await?;

    let preparer_message = format!(
        "Your document \"{}\" ({}) has been approved by {}",
        updated.doc_name, updated.doc_number, approver_name
    );
    store
        .create_notification(
            updated.prepared_by,
            id,
            &preparer_message,
            notify::KIND_STATUS_UPDATE,
        )
        .await?;

    info!(document_id = %id, approver = %approver_name, "document approved");
    Ok(updated)
}

/// pending -> declined (approver) or approved -> declined (issuer). The
/// preparer is told to review and resubmit.
pub async fn decline(store: &EntityStore, id: Uuid, remarks: String) -> AppResult<Document> {
    let document = require_document(store, id).await?;
    ensure_permitted(&document, Transition::Decline)?;

    let from_pending = document.status == DocumentStatus::Pending;
    let decline_remarks = remarks.clone();
    let updated = store
        .transition_document(id, document.status, move |doc| {
            doc.status = DocumentStatus::Declined;
            doc.decline_remarks = Some(decline_remarks);
            if from_pending {
                doc.approved_by = None;
                doc.issued_by = None;
            }
        })
        .await
        .map_err(|err| conflict_to_transition(err, Transition::Decline))?;

    let message = format!(
        "Your document \"{}\" ({}) has been declined. Remarks: {}. Please review and resubmit.",
        updated.doc_name, updated.doc_number, remarks
    );
    store
        .create_notification(updated.prepared_by, id, &message, notify::KIND_DECLINED)
        .await?;

    info!(document_id = %id, "document declined");
    Ok(updated)
}

/// approved -> issued. Notifies the preparer and the approver, and records
/// one recipient row per assigned department.
pub async fn issue(store: &EntityStore, id: Uuid, input: IssueInput) -> AppResult<Document> {
    let document = require_document(store, id).await?;
    ensure_permitted(&document, Transition::Issue)?;

    let issued_by = input.issued_by;
    let issuer_name = input.issuer_name.clone();
    let remarks = input.remarks.clone();
    let updated = store
        .transition_document(id, DocumentStatus::Approved, move |doc| {
            doc.status = DocumentStatus::Issued;
            doc.issued_by = Some(issued_by);
            doc.issuer_name = Some(issuer_name);
            doc.issue_remarks = remarks;
            doc.issued_at = Some(Utc::now());
        })
        .await
        .map_err(|err| conflict_to_transition(err, Transition::Issue))?;

    let preparer_message = format!(
        "Your document \"{}\" ({}) has been issued by {}",
        updated.doc_name, updated.doc_number, input.issuer_name
    );
    store
        .create_notification(updated.prepared_by, id, &preparer_message, notify::KIND_ISSUED)
        .await?;

    if let Some(approved_by) = updated.approved_by {
        let approver_message = format!(
            "Document \"{}\" ({}) has been issued",
            updated.doc_name, updated.doc_number
        );
        store
            .create_notification(approved_by, id, &approver_message, notify::KIND_ISSUED)
            .await?;
    }

    for department in store.document_departments(id).await {
        store
            .create_document_recipient(id, None, Some(department.id))
            .await?;
    }

    info!(document_id = %id, issuer = %input.issuer_name, "document issued");
    Ok(updated)
}

/// Resubmission of a declined document creates a new revision row chained to
/// the declined one; the declined row itself stays terminal.
pub async fn resubmit(store: &EntityStore, declined_id: Uuid, input: SubmitInput) -> AppResult<Document> {
    let declined = require_document(store, declined_id).await?;
    ensure_permitted(&declined, Transition::Resubmit)?;

    let submit_input = SubmitInput {
        doc_number: declined.doc_number.clone(),
        revision_no: declined.revision_no + 1,
        previous_version_id: Some(declined.id),
        ..input
    };
    submit(store, submit_input).await
}

async fn require_document(store: &EntityStore, id: Uuid) -> AppResult<Document> {
    store
        .get_document(id)
        .await
        .ok_or_else(|| AppError::not_found("document not found"))
}

fn ensure_permitted(document: &Document, transition: Transition) -> AppResult<()> {
    if document.status.permits(transition) {
        Ok(())
    } else {
        Err(AppError::invalid_transition(document.status, transition))
    }
}

fn conflict_to_transition(err: StoreError, transition: Transition) -> AppError {
    match err {
        StoreError::StatusConflict { current, .. } => {
            AppError::invalid_transition(current, transition)
        }
        other => other.into(),
    }
}

async fn notify_all_ids(
    store: &EntityStore,
    users: &[crate::models::User],
    document_id: Uuid,
    message: &str,
    kind: &str,
) -> AppResult<()> {
    let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    notify::notify_all(store, user_ids, document_id, message, kind).await?;
    Ok(())
}
