//! Attachment text extraction.
//!
//! Selects a decoding strategy from the attachment's MIME type and filename,
//! fetches bytes through an [`ObjectStore`], and converts them to text with a
//! [`TextDecoder`]. Every failure degrades to `None`; nothing here fails the
//! request.

pub mod decode;
pub mod storage;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use decode::{render_sheets, TextDecoder};
use storage::ObjectStore;

/// Reference to a stored upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttachmentMeta {
    /// Storage id.
    pub id: String,
    /// Stored filename.
    pub filename: String,
    /// Filename as uploaded.
    pub original_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Public or signed URL.
    pub url: String,
    /// Upload timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<String>,
}

/// Decoding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// PDF text layer.
    Pdf,
    /// XLSX / XLS workbook.
    Spreadsheet,
    /// Bytes as (lossy) UTF-8.
    PlainText,
}

impl DocumentFormat {
    /// Pick a format from MIME type and filename.
    pub fn detect(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type.to_lowercase();
        let name = file_name.to_lowercase();
        if mime.contains("pdf") || name.ends_with(".pdf") {
            Self::Pdf
        } else if name.ends_with(".xlsx")
            || name.ends_with(".xls")
            || mime.contains("spreadsheet")
            || mime.contains("excel")
        {
            Self::Spreadsheet
        } else {
            Self::PlainText
        }
    }
}

impl AttachmentMeta {
    /// The name used for format detection: the original name, else the stored one.
    pub fn display_name(&self) -> &str {
        if self.original_name.is_empty() {
            &self.filename
        } else {
            &self.original_name
        }
    }
}

/// Turns attachment references into text.
#[derive(Clone)]
pub struct AttachmentDecoder {
    store: Option<Arc<dyn ObjectStore>>,
    decoders: Arc<dyn TextDecoder>,
    key_prefix: String,
}

impl std::fmt::Debug for AttachmentDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentDecoder")
            .field("store_configured", &self.store.is_some())
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl AttachmentDecoder {
    /// Create a decoder. `store = None` means attachments cannot be fetched.
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        decoders: Arc<dyn TextDecoder>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            decoders,
            key_prefix: key_prefix.into(),
        }
    }

    /// Object key for `attachment`.
    pub fn object_key(&self, attachment: &AttachmentMeta) -> String {
        format!("{}{}", self.key_prefix, attachment.id)
    }

    /// Fetch and decode `attachment`, returning `None` on any failure.
    pub async fn extract_text(&self, attachment: &AttachmentMeta) -> Option<String> {
        let Some(store) = self.store.as_ref() else {
            warn!(attachment_id = %attachment.id, "attachment storage not configured");
            return None;
        };

        let key = self.object_key(attachment);
        let bytes = match store.fetch(&key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(attachment_id = %attachment.id, error = %e, "attachment fetch failed");
                return None;
            }
        };

        let format = DocumentFormat::detect(&attachment.mime_type, attachment.display_name());
        debug!(
            attachment_id = %attachment.id,
            format = ?format,
            bytes = bytes.len(),
            "decoding attachment"
        );

        let decoders = Arc::clone(&self.decoders);
        let joined = tokio::task::spawn_blocking(move || decode_bytes(decoders.as_ref(), format, &bytes)).await;
        match joined {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(attachment_id = %attachment.id, error = %e, "attachment decode failed");
                None
            }
            Err(e) => {
                warn!(attachment_id = %attachment.id, error = %e, "attachment decode task failed");
                None
            }
        }
    }
}

/// Decode `bytes` with the strategy for `format`.
///
/// # Errors
///
/// Propagates decoder errors; plain text never fails.
pub fn decode_bytes(
    decoders: &dyn TextDecoder,
    format: DocumentFormat,
    bytes: &[u8],
) -> Result<String, decode::DecodeError> {
    match format {
        DocumentFormat::Pdf => decoders.pdf_text(bytes),
        DocumentFormat::Spreadsheet => decoders.spreadsheet(bytes).map(|sheets| render_sheets(&sheets)),
        DocumentFormat::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}
