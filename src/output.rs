//! Result types returned by extraction and field extraction.

use crate::error::{RowError, TableIssue};
use crate::pipeline::rows::Row;
use serde::Serialize;

/// How a document's extraction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// A schema was registered and tables were found: `rows` is populated.
    Rows,
    /// No header separator in the document: intro is the whole text.
    NoTables,
    /// Tables exist but no schema is registered for the document.
    UnknownSchema,
}

/// Everything recovered from one document.
///
/// In the two text modes `rows` is empty and callers are expected to inspect
/// `text` by hand.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// The document identifier the extraction was run for.
    pub identifier: String,
    pub mode: ExtractionMode,
    /// The full normalised markdown.
    pub text: String,
    /// Text before the first table's header row (or all of it, trimmed).
    pub intro: String,
    pub rows: Vec<Row>,
    /// Table lines dropped because they had too few cells.
    pub issues: Vec<TableIssue>,
    pub stats: ExtractionStats,
}

impl Extraction {
    pub fn has_rows(&self) -> bool {
        self.mode == ExtractionMode::Rows && !self.rows.is_empty()
    }

    /// True when neither intro text nor rows were recovered.
    pub fn is_empty(&self) -> bool {
        self.intro.trim().is_empty() && self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub table_blocks: usize,
    /// Data lines seen inside table blocks (header/separator rows excluded).
    pub candidate_lines: usize,
    pub rows: usize,
    pub dropped_lines: usize,
    pub duration_ms: u64,
}

/// The model's answer for one row.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResponse {
    /// 1-based position of the row in the extraction's row list.
    pub row_num: usize,
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<RowError>,
}

/// Output of the field-extraction stage.
#[derive(Debug, Clone, Serialize)]
pub struct FieldExtraction {
    pub responses: Vec<FieldResponse>,
    pub stats: FieldStats,
}

impl FieldExtraction {
    /// Successful responses joined the way the output files are written.
    pub fn combined(&self) -> String {
        self.responses
            .iter()
            .filter(|r| r.error.is_none())
            .map(|r| format!("{}\n\n\n", r.text))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    pub selected_rows: usize,
    pub processed_rows: usize,
    pub failed_rows: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}
