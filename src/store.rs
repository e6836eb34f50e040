use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    ControlCopy, CopyAction, Department, Document, DocumentDepartment, DocumentRecipient,
    DocumentStatus, NewDepartment, NewDocument, NewUser, Notification, PrintLog, Role, User,
};

const SNAPSHOT_FILE: &str = "data.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Integrity(String),
    #[error("document is {current}, expected {expected}")]
    StatusConflict {
        current: DocumentStatus,
        expected: DocumentStatus,
    },
    #[error("failed to persist entity store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode entity store: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreData {
    users: Vec<User>,
    documents: Vec<Document>,
    departments: Vec<Department>,
    document_departments: Vec<DocumentDepartment>,
    notifications: Vec<Notification>,
    control_copies: Vec<ControlCopy>,
    print_logs: Vec<PrintLog>,
    document_recipients: Vec<DocumentRecipient>,
}

/// Sole source of truth for all entities. Tables live behind one `RwLock`
/// and every mutation is snapshotted to `data.json` before the lock is
/// released, so readers never observe un-persisted state.
pub struct EntityStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl EntityStore {
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(SNAPSHOT_FILE);
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Seeds one demo user per role and the default departments when the
    /// store is brand new. Returns whether anything was written.
    pub async fn seed_if_empty(&self) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        if !data.users.is_empty() || !data.departments.is_empty() {
            return Ok(false);
        }

        let demo_users = [
            ("creator@example.com", Role::Creator, "Demo Creator", false),
            ("approver@example.com", Role::Approver, "Demo Approver", false),
            ("issuer@example.com", Role::Issuer, "Demo Issuer", true),
            ("admin@example.com", Role::Admin, "Demo Admin", true),
            ("viewer@example.com", Role::Recipient, "Demo Viewer", false),
        ];
        for (username, role, full_name, master_copy_access) in demo_users {
            data.users.push(User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password: "password".to_string(),
                role,
                full_name: full_name.to_string(),
                master_copy_access,
            });
        }

        let now = Utc::now();
        let demo_departments = [
            ("Engineering", "ENG"),
            ("Quality Assurance", "QA"),
            ("Operations", "OPS"),
            ("Finance", "FIN"),
            ("Human Resources", "HR"),
        ];
        for (name, code) in demo_departments {
            data.departments.push(Department {
                id: Uuid::new_v4(),
                name: name.to_string(),
                code: code.to_string(),
                created_at: now,
            });
        }

        self.persist(&data).await?;
        Ok(true)
    }

    // ----- users -----

    pub async fn get_user(&self, id: Uuid) -> Option<User> {
        let data = self.data.read().await;
        data.users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let data = self.data.read().await;
        data.users.iter().find(|u| u.username == username).cloned()
    }

    pub async fn users_by_role(&self, role: Role) -> Vec<User> {
        let data = self.data.read().await;
        data.users.iter().filter(|u| u.role == role).cloned().collect()
    }

    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate(format!(
                "username '{}' is already taken",
                new.username
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            password: new.password,
            role: new.role,
            full_name: new.full_name,
            master_copy_access: new.master_copy_access,
        };
        data.users.push(user.clone());
        self.persist(&data).await?;
        Ok(user)
    }

    /// Hard delete, refused while anything still references the user.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let index = data
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound("user"))?;

        let referenced = data.documents.iter().any(|d| {
            d.prepared_by == id || d.approved_by == Some(id) || d.issued_by == Some(id)
        }) || data.control_copies.iter().any(|c| c.user_id == id)
            || data.print_logs.iter().any(|p| p.user_id == id)
            || data.notifications.iter().any(|n| n.user_id == id)
            || data.document_recipients.iter().any(|r| r.user_id == Some(id));
        if referenced {
            return Err(StoreError::Integrity(
                "user is still referenced by documents or audit records".to_string(),
            ));
        }

        data.users.remove(index);
        self.persist(&data).await?;
        Ok(())
    }

    // ----- documents -----

    pub async fn get_document(&self, id: Uuid) -> Option<Document> {
        let data = self.data.read().await;
        data.documents.iter().find(|d| d.id == id).cloned()
    }

    pub async fn documents_by_status(&self, status: DocumentStatus) -> Vec<Document> {
        let data = self.data.read().await;
        let mut docs: Vec<Document> = data
            .documents
            .iter()
            .filter(|d| d.status == status)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    pub async fn documents_by_user(&self, user_id: Uuid) -> Vec<Document> {
        let data = self.data.read().await;
        let mut docs: Vec<Document> = data
            .documents
            .iter()
            .filter(|d| d.prepared_by == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    pub async fn all_documents(&self) -> Vec<Document> {
        let data = self.data.read().await;
        let mut docs = data.documents.clone();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    /// All issued revisions sharing a document number, ascending by revision.
    pub async fn issued_revisions(&self, doc_number: &str) -> Vec<Document> {
        let data = self.data.read().await;
        let mut docs: Vec<Document> = data
            .documents
            .iter()
            .filter(|d| d.doc_number == doc_number && d.status == DocumentStatus::Issued)
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.revision_no);
        docs
    }

    pub async fn create_document(&self, new: NewDocument) -> Result<Document, StoreError> {
        let mut data = self.data.write().await;
        if data
            .documents
            .iter()
            .any(|d| d.doc_number == new.doc_number && d.revision_no == new.revision_no)
        {
            return Err(StoreError::Duplicate(format!(
                "document {} revision {} already exists",
                new.doc_number, new.revision_no
            )));
        }
        if let Some(previous_id) = new.previous_version_id {
            let previous = data
                .documents
                .iter()
                .find(|d| d.id == previous_id)
                .ok_or(StoreError::NotFound("previous version"))?;
            if previous.doc_number != new.doc_number || previous.revision_no >= new.revision_no {
                return Err(StoreError::Integrity(
                    "previous version must share the document number and precede this revision"
                        .to_string(),
                ));
            }
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            doc_name: new.doc_name,
            doc_number: new.doc_number,
            status: DocumentStatus::Pending,
            date_of_issue: new.date_of_issue,
            revision_no: new.revision_no,
            prepared_by: new.prepared_by,
            approved_by: None,
            issued_by: None,
            header_info: new.header_info,
            footer_info: new.footer_info,
            due_period_years: new.due_period_years,
            reason_for_revision: new.reason_for_revision,
            review_due_date: new.review_due_date,
            created_at: now,
            updated_at: now,
            approved_at: None,
            issued_at: None,
            approval_remarks: None,
            decline_remarks: None,
            issue_remarks: None,
            issuer_name: None,
            previous_version_id: new.previous_version_id,
            source_file_path: new.source_file_path,
            source_checksum: new.source_checksum,
            pdf_file_path: None,
        };
        data.documents.push(document.clone());
        self.persist(&data).await?;
        Ok(document)
    }

    /// Conditional status transition: `apply` runs only while the row is
    /// still in `expected`. A mismatch means a concurrent transition won and
    /// the caller's request is stale.
    pub async fn transition_document<F>(
        &self,
        id: Uuid,
        expected: DocumentStatus,
        apply: F,
    ) -> Result<Document, StoreError>
    where
        F: FnOnce(&mut Document),
    {
        let mut data = self.data.write().await;
        let document = data
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound("document"))?;
        if document.status != expected {
            return Err(StoreError::StatusConflict {
                current: document.status,
                expected,
            });
        }
        apply(document);
        document.updated_at = Utc::now();
        let updated = document.clone();
        self.persist(&data).await?;
        Ok(updated)
    }

    pub async fn set_pdf_path(&self, id: Uuid, path: &str) -> Result<Document, StoreError> {
        let mut data = self.data.write().await;
        let document = data
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound("document"))?;
        document.pdf_file_path = Some(path.to_string());
        document.updated_at = Utc::now();
        let updated = document.clone();
        self.persist(&data).await?;
        Ok(updated)
    }

    // ----- departments -----

    pub async fn list_departments(&self) -> Vec<Department> {
        let data = self.data.read().await;
        data.departments.clone()
    }

    pub async fn get_department(&self, id: Uuid) -> Option<Department> {
        let data = self.data.read().await;
        data.departments.iter().find(|d| d.id == id).cloned()
    }

    pub async fn create_department(&self, new: NewDepartment) -> Result<Department, StoreError> {
        let mut data = self.data.write().await;
        if data
            .departments
            .iter()
            .any(|d| d.name == new.name || d.code == new.code)
        {
            return Err(StoreError::Duplicate(format!(
                "department '{}' ({}) already exists",
                new.name, new.code
            )));
        }
        let department = Department {
            id: Uuid::new_v4(),
            name: new.name,
            code: new.code,
            created_at: Utc::now(),
        };
        data.departments.push(department.clone());
        self.persist(&data).await?;
        Ok(department)
    }

    /// Department deletion cascades to its document associations and
    /// recipient rows.
    pub async fn delete_department(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let index = data
            .departments
            .iter()
            .position(|d| d.id == id)
            .ok_or(StoreError::NotFound("department"))?;
        data.departments.remove(index);
        data.document_departments.retain(|dd| dd.department_id != id);
        data.document_recipients.retain(|dr| dr.department_id != Some(id));
        self.persist(&data).await?;
        Ok(())
    }

    /// Replaces the document's department assignment wholesale.
    pub async fn assign_document_departments(
        &self,
        document_id: Uuid,
        department_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        if !data.documents.iter().any(|d| d.id == document_id) {
            return Err(StoreError::NotFound("document"));
        }
        for department_id in department_ids {
            if !data.departments.iter().any(|d| d.id == *department_id) {
                return Err(StoreError::NotFound("department"));
            }
        }
        data.document_departments.retain(|dd| dd.document_id != document_id);
        let now = Utc::now();
        for department_id in department_ids {
            data.document_departments.push(DocumentDepartment {
                id: Uuid::new_v4(),
                document_id,
                department_id: *department_id,
                created_at: now,
            });
        }
        self.persist(&data).await?;
        Ok(())
    }

    pub async fn document_departments(&self, document_id: Uuid) -> Vec<Department> {
        let data = self.data.read().await;
        let ids: Vec<Uuid> = data
            .document_departments
            .iter()
            .filter(|dd| dd.document_id == document_id)
            .map(|dd| dd.department_id)
            .collect();
        data.departments
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect()
    }

    // ----- notifications -----

    pub async fn create_notification(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        message: &str,
        kind: &str,
    ) -> Result<Notification, StoreError> {
        let mut data = self.data.write().await;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            message: message.to_string(),
            kind: kind.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        data.notifications.push(notification.clone());
        self.persist(&data).await?;
        Ok(notification)
    }

    pub async fn notifications_for_user(&self, user_id: Uuid) -> Vec<Notification> {
        let data = self.data.read().await;
        let mut rows: Vec<Notification> = data
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let notification = data
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotFound("notification"))?;
        notification.is_read = true;
        self.persist(&data).await?;
        Ok(())
    }

    // ----- control copies & print logs -----

    /// Issues the next control copy for the (document, user) pair. The copy
    /// number is computed and the row inserted inside one write section, so
    /// concurrent requests cannot observe the same predecessor. A `print`
    /// action also records its PrintLog here, in the same section.
    pub async fn issue_control_copy(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        action: CopyAction,
    ) -> Result<ControlCopy, StoreError> {
        let mut data = self.data.write().await;
        if !data.documents.iter().any(|d| d.id == document_id) {
            return Err(StoreError::NotFound("document"));
        }
        let copy_number = data
            .control_copies
            .iter()
            .filter(|c| c.document_id == document_id && c.user_id == user_id)
            .map(|c| c.copy_number)
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now();
        let copy = ControlCopy {
            id: Uuid::new_v4(),
            document_id,
            user_id,
            copy_number,
            action_type: action,
            generated_at: now,
        };
        data.control_copies.push(copy.clone());
        if action == CopyAction::Print {
            data.print_logs.push(PrintLog {
                id: Uuid::new_v4(),
                document_id,
                user_id,
                control_copy_id: copy.id,
                medium: Some("PDF".to_string()),
                printed_at: now,
            });
        }
        self.persist(&data).await?;
        debug!(document_id = %document_id, user_id = %user_id, copy_number, action = %action, "issued control copy");
        Ok(copy)
    }

    pub async fn control_copies_by_document(&self, document_id: Uuid) -> Vec<ControlCopy> {
        let data = self.data.read().await;
        let mut rows: Vec<ControlCopy> = data
            .control_copies
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        rows
    }

    pub async fn control_copies_by_user(&self, user_id: Uuid) -> Vec<ControlCopy> {
        let data = self.data.read().await;
        let mut rows: Vec<ControlCopy> = data
            .control_copies
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        rows
    }

    pub async fn get_control_copy(&self, id: Uuid) -> Option<ControlCopy> {
        let data = self.data.read().await;
        data.control_copies.iter().find(|c| c.id == id).cloned()
    }

    pub async fn print_logs_by_document(&self, document_id: Uuid) -> Vec<PrintLog> {
        let data = self.data.read().await;
        let mut rows: Vec<PrintLog> = data
            .print_logs
            .iter()
            .filter(|p| p.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.printed_at.cmp(&a.printed_at));
        rows
    }

    pub async fn print_logs_by_user(&self, user_id: Uuid) -> Vec<PrintLog> {
        let data = self.data.read().await;
        let mut rows: Vec<PrintLog> = data
            .print_logs
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.printed_at.cmp(&a.printed_at));
        rows
    }

    // ----- recipients -----

    pub async fn create_document_recipient(
        &self,
        document_id: Uuid,
        user_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> Result<DocumentRecipient, StoreError> {
        if user_id.is_none() && department_id.is_none() {
            return Err(StoreError::Integrity(
                "document recipient must name a user or a department".to_string(),
            ));
        }
        let mut data = self.data.write().await;
        let recipient = DocumentRecipient {
            id: Uuid::new_v4(),
            document_id,
            user_id,
            department_id,
            notified_at: Utc::now(),
            read_at: None,
        };
        data.document_recipients.push(recipient.clone());
        self.persist(&data).await?;
        Ok(recipient)
    }

    pub async fn document_recipients(&self, document_id: Uuid) -> Vec<DocumentRecipient> {
        let data = self.data.read().await;
        data.document_recipients
            .iter()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect()
    }

    /// Issued documents a recipient user was individually granted.
    pub async fn accessible_documents_for_user(&self, user_id: Uuid) -> Vec<Document> {
        let data = self.data.read().await;
        let ids: Vec<Uuid> = data
            .document_recipients
            .iter()
            .filter(|r| r.user_id == Some(user_id))
            .map(|r| r.document_id)
            .collect();
        data.documents
            .iter()
            .filter(|d| ids.contains(&d.id) && d.status == DocumentStatus::Issued)
            .cloned()
            .collect()
    }
}
