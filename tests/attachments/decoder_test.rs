//! Format detection, decoder dispatch, and failure degradation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sift::attachments::decode::{render_sheets, DecodeError, Sheet, TextDecoder};
use sift::attachments::storage::{ObjectStore, StorageError};
use sift::attachments::{decode_bytes, AttachmentDecoder, AttachmentMeta, DocumentFormat};

struct MemoryStore(HashMap<String, Vec<u8>>);

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.0
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::InvalidUrl(format!("missing {key}")))
    }
}

/// Decoder that labels its output so dispatch can be observed.
struct LabelDecoders;

impl TextDecoder for LabelDecoders {
    fn pdf_text(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Pdf("empty".to_owned()));
        }
        Ok(format!("pdf:{}", String::from_utf8_lossy(bytes)))
    }

    fn spreadsheet(&self, bytes: &[u8]) -> Result<Vec<Sheet>, DecodeError> {
        Ok(vec![Sheet {
            name: "Sheet1".to_owned(),
            rows: vec![vec!["bytes".to_owned(), bytes.len().to_string()]],
        }])
    }
}

fn meta(id: &str, name: &str, mime: &str) -> AttachmentMeta {
    AttachmentMeta {
        id: id.to_owned(),
        original_name: name.to_owned(),
        mime_type: mime.to_owned(),
        ..AttachmentMeta::default()
    }
}

fn decoder_with(objects: &[(&str, &[u8])]) -> AttachmentDecoder {
    let store = MemoryStore(
        objects
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.to_vec()))
            .collect(),
    );
    AttachmentDecoder::new(Some(Arc::new(store)), Arc::new(LabelDecoders), "uploads/")
}

#[test]
fn format_detection() {
    assert_eq!(DocumentFormat::detect("application/pdf", "x"), DocumentFormat::Pdf);
    assert_eq!(DocumentFormat::detect("", "Scan.PDF"), DocumentFormat::Pdf);
    assert_eq!(
        DocumentFormat::detect("application/octet-stream", "book.xlsx"),
        DocumentFormat::Spreadsheet
    );
    assert_eq!(
        DocumentFormat::detect("application/vnd.ms-excel", "book"),
        DocumentFormat::Spreadsheet
    );
    assert_eq!(DocumentFormat::detect("text/plain", "notes.txt"), DocumentFormat::PlainText);
}

#[test]
fn display_name_prefers_original() {
    let mut m = meta("1", "Original.pdf", "application/pdf");
    m.filename = "stored-1.pdf".to_owned();
    assert_eq!(m.display_name(), "Original.pdf");
    m.original_name.clear();
    assert_eq!(m.display_name(), "stored-1.pdf");
}

#[test]
fn sheets_render_as_csv_blocks() {
    let sheets = vec![
        Sheet {
            name: "Costs".to_owned(),
            rows: vec![
                vec!["Item".to_owned(), "Price".to_owned()],
                vec!["Pipe, copper".to_owned(), "12.5".to_owned()],
            ],
        },
        Sheet {
            name: "Notes".to_owned(),
            rows: vec![vec!["say \"hi\"".to_owned()]],
        },
    ];
    assert_eq!(
        render_sheets(&sheets),
        "--- Sheet: Costs ---\nItem,Price\n\"Pipe, copper\",12.5\n\n--- Sheet: Notes ---\n\"say \"\"hi\"\"\"\n"
    );
}

#[test]
fn plain_text_is_lossy_utf8() {
    let text = decode_bytes(&LabelDecoders, DocumentFormat::PlainText, b"caf\xc3\xa9 \xff")
        .expect("plain text never fails");
    assert_eq!(text, "café \u{fffd}");
}

#[tokio::test]
async fn extracts_by_prefixed_key() {
    let decoder = decoder_with(&[("uploads/att-1", b"hello")]);
    let attachment = meta("att-1", "scan.pdf", "application/pdf");
    assert_eq!(decoder.object_key(&attachment), "uploads/att-1");
    assert_eq!(
        decoder.extract_text(&attachment).await.as_deref(),
        Some("pdf:hello")
    );
}

#[tokio::test]
async fn spreadsheet_dispatch() {
    let decoder = decoder_with(&[("uploads/s", b"abc")]);
    let text = decoder
        .extract_text(&meta("s", "book.xlsx", ""))
        .await
        .expect("text");
    assert!(text.starts_with("--- Sheet: Sheet1 ---\nbytes,3"));
}

#[tokio::test]
async fn failures_degrade_to_none() {
    let decoder = decoder_with(&[("uploads/empty", b"")]);
    // fetch failure
    assert_eq!(decoder.extract_text(&meta("missing", "a.txt", "text/plain")).await, None);
    // decode failure
    assert_eq!(decoder.extract_text(&meta("empty", "a.pdf", "application/pdf")).await, None);

    let unconfigured = AttachmentDecoder::new(None, Arc::new(LabelDecoders), "");
    assert_eq!(unconfigured.extract_text(&meta("x", "a.txt", "text/plain")).await, None);
}
