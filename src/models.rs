use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Approver,
    Issuer,
    Admin,
    Recipient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Approver => "approver",
            Role::Issuer => "issuer",
            Role::Admin => "admin",
            Role::Recipient => "recipient",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Declined,
    Issued,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Declined => "declined",
            DocumentStatus::Issued => "issued",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyAction {
    View,
    Print,
}

impl std::fmt::Display for CopyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyAction::View => f.write_str("view"),
            CopyAction::Print => f.write_str("print"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    pub master_copy_access: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(default)]
    pub master_copy_access: bool,
}

/// One revision of a logical document. Revisions of the same logical
/// document share `doc_number`; the (doc_number, revision_no) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub doc_name: String,
    pub doc_number: String,
    pub status: DocumentStatus,
    pub date_of_issue: Option<DateTime<Utc>>,
    pub revision_no: i32,
    pub prepared_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub issued_by: Option<Uuid>,
    pub header_info: Option<String>,
    pub footer_info: Option<String>,
    pub due_period_years: Option<i32>,
    pub reason_for_revision: Option<String>,
    pub review_due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub approval_remarks: Option<String>,
    pub decline_remarks: Option<String>,
    pub issue_remarks: Option<String>,
    pub issuer_name: Option<String>,
    pub previous_version_id: Option<Uuid>,
    pub source_file_path: Option<String>,
    pub source_checksum: Option<String>,
    pub pdf_file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub doc_name: String,
    pub doc_number: String,
    pub revision_no: i32,
    pub prepared_by: Uuid,
    pub date_of_issue: Option<DateTime<Utc>>,
    pub due_period_years: Option<i32>,
    pub reason_for_revision: Option<String>,
    pub review_due_date: Option<DateTime<Utc>>,
    pub header_info: Option<String>,
    pub footer_info: Option<String>,
    pub previous_version_id: Option<Uuid>,
    pub source_file_path: Option<String>,
    pub source_checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDepartment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub department_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One issuance of rendered output to one user for one document revision.
/// `copy_number` is the 1-based sequence scoped to the (document_id, user_id)
/// pair. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCopy {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub copy_number: i32,
    pub action_type: CopyAction,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintLog {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub control_copy_id: Uuid,
    pub medium: Option<String>,
    pub printed_at: DateTime<Utc>,
}

/// Grants a department or an individual user visibility of an issued
/// document. At least one of `user_id` / `department_id` is always set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecipient {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub notified_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
