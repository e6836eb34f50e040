use uuid::Uuid;

use crate::store::{EntityStore, StoreError};

pub const KIND_NEW_DOCUMENT: &str = "new_document";
pub const KIND_APPROVED_DOCUMENT: &str = "approved_document";
pub const KIND_STATUS_UPDATE: &str = "document_status_update";
pub const KIND_DECLINED: &str = "document_declined";
pub const KIND_ISSUED: &str = "document_issued";

/// Creates one notification row per addressee. Repeated identical events
/// produce fresh rows; the feed is an audit trail, not a deduplicated inbox.
pub async fn notify_all(
    store: &EntityStore,
    user_ids: impl IntoIterator<Item = Uuid>,
    document_id: Uuid,
    message: &str,
    kind: &str,
) -> Result<(), StoreError> {
    for user_id in user_ids {
        store
            .create_notification(user_id, document_id, message, kind)
            .await?;
    }
    Ok(())
}
