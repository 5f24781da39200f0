//! Error types for the edgequake-gazette library.
//!
//! Two kinds of failure reflect two distinct scopes:
//!
//! * [`GazetteError`]: **Fatal** for one document: no markdown could be
//!   obtained (missing file, corrupt PDF, converter failure) or a whole stage
//!   produced nothing (every row's field extraction failed). Returned as
//!   `Err(GazetteError)` from the top-level `extract*` functions.
//!
//! * [`TableIssue`], [`PageError`] and [`RowError`]: **Non-fatal**: one
//!   table line was malformed, one page could not be transcribed, or one
//!   row's model call failed. They are stored next to the
//!   results that did succeed so callers can report partial success instead
//!   of losing the document to one bad line.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-gazette library.
#[derive(Debug, Error)]
pub enum GazetteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The markdown conversion step failed for this document.
    #[error("Error processing '{path}': {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    /// The conversion succeeded but produced no text at all.
    #[error("No text extracted from '{path}'\nThe document might be image-based or empty.")]
    EmptyDocument { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every selected row failed field extraction; output would be empty.
    #[error("All {total} rows failed field extraction after {retries} retries each.\nFirst error: {first_error}")]
    AllRowsFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    // ── Schema errors ─────────────────────────────────────────────────────
    /// A schema registry file could not be read or parsed.
    #[error("Invalid schema file '{path}': {detail}")]
    SchemaFile { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use a specific copy, or install\n\
pdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A malformed table line that was dropped during row reconstruction.
///
/// Source tables frequently contain continuation lines that were split off
/// a ragged multi-line cell; they are reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum TableIssue {
    /// The line has fewer cells than the schema has columns.
    #[error("Line {line} has {found} columns, expected at least {expected}: {content}")]
    MissingCells {
        /// 1-based line number inside the normalized document.
        line: usize,
        found: usize,
        expected: usize,
        content: String,
    },
}

/// A non-fatal error for a single page during PDF conversion.
///
/// The page is left out of the markdown; conversion fails only when every
/// page does.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// PNG encoding of the rendered page failed.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// LLM call failed after retries.
    #[error("Page {page}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed { page: usize, retries: u8, detail: String },

    /// LLM call timed out on the final attempt.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

/// A non-fatal error for a single row's field extraction.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RowError {
    /// LLM call failed after retries.
    #[error("Row {row}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed { row: usize, retries: u8, detail: String },

    /// LLM call timed out on the final attempt.
    #[error("Row {row}: LLM call timed out after {secs}s")]
    Timeout { row: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_mentions_path() {
        let e = GazetteError::ConversionFailed {
            path: PathBuf::from("data/diathesi.pdf"),
            detail: "broken xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("data/diathesi.pdf"), "got: {msg}");
        assert!(msg.contains("broken xref"));
    }

    #[test]
    fn missing_cells_display() {
        let issue = TableIssue::MissingCells {
            line: 7,
            found: 1,
            expected: 2,
            content: "|x|".into(),
        };
        let msg = issue.to_string();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("has 1 columns, expected at least 2"));
        assert!(msg.ends_with("|x|"));
    }

    #[test]
    fn all_rows_failed_display() {
        let e = GazetteError::AllRowsFailed {
            total: 14,
            retries: 3,
            first_error: "throttled".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 14 rows"));
        assert!(msg.contains("throttled"));
    }

    #[test]
    fn row_timeout_display() {
        let e = RowError::Timeout { row: 3, secs: 120 };
        assert_eq!(e.to_string(), "Row 3: LLM call timed out after 120s");
    }
}
