//! # edgequake-gazette
//!
//! Extract structured personnel records from Greek government-gazette (ΦΕΚ)
//! PDFs: appointments, placements and transfers published as long pipe
//! tables under a free-text decision.
//!
//! ## Why this crate?
//!
//! Gazette PDFs carry their text in legacy Greek encodings. Text-layer
//! extraction mangles the letters (`΢` for `Σ`, `ζ` for `ε`, sigma forms
//! swapped) and breaks multi-line table cells into ragged fragments. This
//! crate transcribes each page with a vision LLM, repairs the systematic
//! character substitutions that still slip through, and rebuilds table rows
//! against a hand-maintained column layout per document type.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / .md
//!  │
//!  ├─ 1. Convert    pdfium rasterise → VLM per page → cleanup   (convert)
//!  ├─ 2. Normalize  ordered literal fixes + sigma rules          (pipeline::normalize)
//!  ├─ 3. Segment    intro text + raw pipe-table blocks           (pipeline::segment)
//!  ├─ 4. Schema     document identifier → ordered column names   (schema)
//!  ├─ 5. Rows       positional cell → column mapping             (pipeline::rows)
//!  └─ 6. Fields     optional per-row LLM field extraction        (fields)
//! ```
//!
//! Only a failure to obtain any markdown is fatal. Malformed table lines are
//! dropped and reported in [`Extraction::issues`]; documents without tables
//! or without a registered layout fall back to returning the normalised text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_gazette::{extract, extract_fields, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let extraction = extract("data/diathesi.pdf", &config).await?;
//!     eprintln!("{} rows, {} dropped lines", extraction.rows.len(), extraction.issues.len());
//!
//!     let fields = extract_fields(&extraction.intro, &extraction.rows, &config).await?;
//!     print!("{}", fields.combined());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gazette` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-gazette = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod fields;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, RowSelection};
pub use convert::{AutoSource, MarkdownFile, MarkdownSource, StaticMarkdown, VisionMarkdown};
pub use error::{GazetteError, PageError, RowError, TableIssue};
pub use extract::{
    extract, extract_document, extract_document_with_schema, extract_markdown, extract_pdf_bytes,
    extract_sync, parse_markdown, write_atomic,
};
pub use fields::extract_fields;
pub use output::{Extraction, ExtractionMode, ExtractionStats, FieldExtraction, FieldResponse, FieldStats};
pub use pipeline::rows::Row;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{ColumnSchema, SchemaRegistry};
