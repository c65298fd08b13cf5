//! Document-to-text decoders.
//!
//! Decoders are synchronous and CPU bound; callers run them on
//! `tokio::task::spawn_blocking`.

/// Errors from decoding document bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// PDF text extraction failed.
    #[error("pdf: {0}")]
    Pdf(String),

    /// The PDF library panicked on malformed input.
    #[error("pdf extraction panicked (malformed file)")]
    PdfPanicked,

    /// Workbook could not be opened or read.
    #[error("spreadsheet: {0}")]
    Spreadsheet(String),
}

/// One worksheet rendered to strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Sheet name.
    pub name: String,
    /// Rows of cell text.
    pub rows: Vec<Vec<String>>,
}

/// Converts document bytes to text.
pub trait TextDecoder: Send + Sync {
    /// Extract the text layer of a PDF.
    fn pdf_text(&self, bytes: &[u8]) -> Result<String, DecodeError>;

    /// Read every worksheet of an XLSX/XLS workbook.
    fn spreadsheet(&self, bytes: &[u8]) -> Result<Vec<Sheet>, DecodeError>;
}

/// Decoders backed by `pdf-extract` and `calamine`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDecoders;

impl TextDecoder for NativeDecoders {
    fn pdf_text(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        // pdf-extract can panic on malformed input.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(DecodeError::Pdf(e.to_string())),
            Err(_) => Err(DecodeError::PdfPanicked),
        }
    }

    fn spreadsheet(&self, bytes: &[u8]) -> Result<Vec<Sheet>, DecodeError> {
        use calamine::{open_workbook_auto_from_rs, Reader};

        let cursor = std::io::Cursor::new(bytes.to_vec());
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = match workbook.worksheet_range(&name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!(sheet = %name, error = %e, "skipping unreadable worksheet");
                    continue;
                }
            };
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }
        Ok(sheets)
    }
}

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({e:?})"),
        Data::DateTime(dt) => dt.to_string(),
    }
}

/// Render sheets as `--- Sheet: <name> ---` headers followed by CSV rows.
pub fn render_sheets(sheets: &[Sheet]) -> String {
    let mut out = String::new();
    for sheet in sheets {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("--- Sheet: ");
        out.push_str(&sheet.name);
        out.push_str(" ---\n");
        for row in &sheet.rows {
            let line: Vec<String> = row.iter().map(|cell| csv_field(cell)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
    }
    out
}

/// Quote a CSV field when it holds a separator, quote or line break.
fn csv_field(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_owned()
    }
}
