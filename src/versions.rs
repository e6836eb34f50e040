//! Versioning and access resolution. A logical document is the set of rows
//! sharing a `doc_number`; only issued revisions are ever served to readers.
//! Both the view and print paths resolve through [`resolve_accessible_revision`].

use crate::error::{AppError, AppResult};
use crate::models::{Document, User};
use crate::store::EntityStore;

/// The issued revision with the highest revision number, or `NotFound` when
/// nothing under this number has been issued yet.
pub async fn latest_revision(store: &EntityStore, doc_number: &str) -> AppResult<Document> {
    store
        .issued_revisions(doc_number)
        .await
        .into_iter()
        .max_by_key(|d| d.revision_no)
        .ok_or_else(|| {
            AppError::not_found(format!("no issued versions found for document {doc_number}"))
        })
}

/// Resolves which issued revision `user` may retrieve.
///
/// Without an explicit request this is always the latest issued revision.
/// An explicit revision number requires master-copy access, except when the
/// requested number is the current latest, which any user may name.
pub async fn resolve_accessible_revision(
    store: &EntityStore,
    doc_number: &str,
    requested: Option<i32>,
    user: &User,
) -> AppResult<Document> {
    let latest = latest_revision(store, doc_number).await?;
    let Some(revision_no) = requested else {
        return Ok(latest);
    };

    if revision_no == latest.revision_no {
        return Ok(latest);
    }
    if !user.master_copy_access {
        return Err(AppError::access_denied(
            "access denied: only master copy users can access specific versions",
        ));
    }

    store
        .issued_revisions(doc_number)
        .await
        .into_iter()
        .find(|d| d.revision_no == revision_no)
        .ok_or_else(|| AppError::not_found(format!("version {revision_no} not found")))
}

/// The revision list a user is allowed to see: the full issued history for
/// master-copy users, a singleton holding the latest for everyone else.
pub async fn accessible_versions(
    store: &EntityStore,
    doc_number: &str,
    user: &User,
) -> AppResult<Vec<Document>> {
    if user.master_copy_access {
        let revisions = store.issued_revisions(doc_number).await;
        if revisions.is_empty() {
            return Err(AppError::not_found(format!(
                "no issued versions found for document {doc_number}"
            )));
        }
        Ok(revisions)
    } else {
        Ok(vec![latest_revision(store, doc_number).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentStatus, NewDocument, Role};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn user(master_copy_access: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "reader@example.com".to_string(),
            password: "pw".to_string(),
            role: Role::Recipient,
            full_name: "Reader".to_string(),
            master_copy_access,
        }
    }

    async fn issued_doc(store: &EntityStore, doc_number: &str, revision_no: i32) -> Document {
        let doc = store
            .create_document(NewDocument {
                doc_name: "Procedure".to_string(),
                doc_number: doc_number.to_string(),
                revision_no,
                prepared_by: Uuid::new_v4(),
                date_of_issue: None,
                due_period_years: None,
                reason_for_revision: None,
                review_due_date: None,
                header_info: None,
                footer_info: None,
                previous_version_id: None,
                source_file_path: None,
                source_checksum: None,
            })
            .await
            .unwrap();
        store
            .transition_document(doc.id, DocumentStatus::Pending, |d| {
                d.status = DocumentStatus::Issued;
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn latest_revision_picks_the_highest_issued_number() {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();
        issued_doc(&store, "SOP-100", 0).await;
        issued_doc(&store, "SOP-100", 2).await;
        issued_doc(&store, "SOP-100", 1).await;

        let latest = latest_revision(&store, "SOP-100").await.unwrap();
        assert_eq!(latest.revision_no, 2);
    }

    #[tokio::test]
    async fn pending_revisions_are_invisible_to_the_resolver() {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();
        store
            .create_document(NewDocument {
                doc_name: "Procedure".to_string(),
                doc_number: "SOP-101".to_string(),
                revision_no: 0,
                prepared_by: Uuid::new_v4(),
                date_of_issue: None,
                due_period_years: None,
                reason_for_revision: None,
                review_due_date: None,
                header_info: None,
                footer_info: None,
                previous_version_id: None,
                source_file_path: None,
                source_checksum: None,
            })
            .await
            .unwrap();

        let err = latest_revision(&store, "SOP-101").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_master_users_cannot_name_old_revisions() {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();
        issued_doc(&store, "SOP-102", 0).await;
        issued_doc(&store, "SOP-102", 1).await;

        let reader = user(false);
        let err = resolve_accessible_revision(&store, "SOP-102", Some(0), &reader)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        // naming the current latest is allowed
        let resolved = resolve_accessible_revision(&store, "SOP-102", Some(1), &reader)
            .await
            .unwrap();
        assert_eq!(resolved.revision_no, 1);
    }

    #[tokio::test]
    async fn master_users_fetch_exact_revisions() {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();
        issued_doc(&store, "SOP-103", 0).await;
        issued_doc(&store, "SOP-103", 3).await;

        let master = user(true);
        let resolved = resolve_accessible_revision(&store, "SOP-103", Some(0), &master)
            .await
            .unwrap();
        assert_eq!(resolved.revision_no, 0);

        let err = resolve_accessible_revision(&store, "SOP-103", Some(2), &master)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn version_listing_depends_on_master_access() {
        let dir = tempdir().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();
        issued_doc(&store, "SOP-104", 0).await;
        issued_doc(&store, "SOP-104", 1).await;

        let all = accessible_versions(&store, "SOP-104", &user(true)).await.unwrap();
        assert_eq!(all.len(), 2);

        let latest_only = accessible_versions(&store, "SOP-104", &user(false))
            .await
            .unwrap();
        assert_eq!(latest_only.len(), 1);
        assert_eq!(latest_only[0].revision_no, 1);
    }
}
