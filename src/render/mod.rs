//! Rendering pipeline: source bytes + document metadata + an optional
//! control-copy stamp in, PDF bytes out. The primary path extracts the Word
//! body and composes it; when extraction fails or exceeds the time bound,
//! the fallback still composes a valid PDF from the document's metadata and
//! whatever text can be salvaged from the raw bytes, so an issued document
//! stays viewable even with a damaged source.

pub mod docx;
pub mod pdf;

use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::Document;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),
    #[error("rendering engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// Footer stamp identifying one controlled copy.
#[derive(Debug, Clone)]
pub struct ControlCopyStamp {
    pub user_id: Uuid,
    pub user_name: String,
    pub copy_number: i32,
    pub date: String,
}

pub struct RenderPipeline {
    timeout: Duration,
}

impl RenderPipeline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Converts a stored source document into stamped PDF bytes. The
    /// conversion runs on a blocking worker under the configured time bound;
    /// any primary failure falls over to the metadata fallback rather than
    /// failing the request.
    pub async fn render_to_pdf(
        &self,
        document: &Document,
        source: Vec<u8>,
        stamp: Option<ControlCopyStamp>,
    ) -> Result<Vec<u8>, RenderError> {
        let primary_document = document.clone();
        let primary_stamp = stamp.clone();
        let primary_source = source.clone();
        let primary = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || {
                let paragraphs = docx::extract_paragraphs(&primary_source)?;
                pdf::compose(&primary_document, &paragraphs, primary_stamp.as_ref())
            }),
        )
        .await;

        match primary {
            Ok(Ok(Ok(bytes))) => return Ok(bytes),
            Ok(Ok(Err(err))) => {
                warn!(document_id = %document.id, error = %err, "primary conversion failed, using fallback");
            }
            Ok(Err(join_err)) => {
                warn!(document_id = %document.id, error = %join_err, "conversion task failed, using fallback");
            }
            Err(_) => {
                warn!(
                    document_id = %document.id,
                    timeout_secs = self.timeout.as_secs(),
                    "conversion timed out, using fallback"
                );
            }
        }

        let paragraphs = fallback_paragraphs(document, salvage_text(&source));
        pdf::compose(document, &paragraphs, stamp.as_ref())
    }

    /// Structured preview of the raw source. Pure: no stamp, no artifact,
    /// no control copy.
    pub fn render_for_viewing(&self, source: &[u8]) -> Result<Vec<String>, RenderError> {
        docx::extract_paragraphs(source)
    }
}

const SALVAGE_MIN_RUN: usize = 8;
const SALVAGE_MAX_RUNS: usize = 200;

/// Pulls printable ASCII runs out of an unconvertible source, in the manner
/// of `strings(1)`.
fn salvage_text(bytes: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for &byte in bytes {
        if byte.is_ascii_graphic() || byte == b' ' {
            current.push(byte as char);
        } else {
            if current.trim().len() >= SALVAGE_MIN_RUN {
                runs.push(current.trim().to_string());
                if runs.len() >= SALVAGE_MAX_RUNS {
                    return runs;
                }
            }
            current.clear();
        }
    }
    if current.trim().len() >= SALVAGE_MIN_RUN && runs.len() < SALVAGE_MAX_RUNS {
        runs.push(current.trim().to_string());
    }
    runs
}

fn fallback_paragraphs(document: &Document, salvaged: Vec<String>) -> Vec<String> {
    let mut paragraphs = vec![
        format!("Document: {}", document.doc_name),
        format!("Document Number: {}", document.doc_number),
        format!("Revision: {}", document.revision_no),
        format!("Status: {}", document.status),
    ];
    if salvaged.is_empty() {
        paragraphs.push(
            "The document content could not be converted; this copy carries the document details only."
                .to_string(),
        );
    } else {
        paragraphs.push("Recovered content:".to_string());
        paragraphs.extend(salvaged);
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStatus;
    use chrono::Utc;

    fn sample_document() -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            doc_name: "Fallback Sample".to_string(),
            doc_number: "QC-SOP-009".to_string(),
            status: DocumentStatus::Issued,
            date_of_issue: Some(now),
            revision_no: 0,
            prepared_by: Uuid::new_v4(),
            approved_by: None,
            issued_by: None,
            header_info: None,
            footer_info: None,
            due_period_years: None,
            reason_for_revision: None,
            review_due_date: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
            issued_at: Some(now),
            approval_remarks: None,
            decline_remarks: None,
            issue_remarks: None,
            issuer_name: None,
            previous_version_id: None,
            source_file_path: None,
            source_checksum: None,
            pdf_file_path: None,
        }
    }

    #[tokio::test]
    async fn corrupted_source_still_renders_via_fallback() {
        let pipeline = RenderPipeline::new(Duration::from_secs(5));
        let bytes = pipeline
            .render_to_pdf(&sample_document(), b"not a docx at all".to_vec(), None)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn empty_source_still_renders_via_fallback() {
        let pipeline = RenderPipeline::new(Duration::from_secs(5));
        let bytes = pipeline
            .render_to_pdf(&sample_document(), Vec::new(), None)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn salvage_keeps_only_substantial_runs() {
        let mut bytes = Vec::new();
        bytes.extend(b"short\x00\x01");
        bytes.extend(b"a much longer printable run of text\x02");
        let runs = salvage_text(&bytes);
        assert_eq!(runs, vec!["a much longer printable run of text"]);
    }
}
