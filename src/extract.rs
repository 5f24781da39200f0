//! Pipeline orchestration: markdown → normalised text → intro + rows.
//!
//! The text stages are pure and synchronous ([`parse_markdown`]); only the
//! markdown conversion in front of them suspends. The async entry points
//! wrap a [`MarkdownSource`] call around the same parse.
//!
//! ```text
//! source ──▶ normalize ──▶ segment ──▶ schema lookup ──▶ rows
//!   │                        │              │
//!   └─ ConversionFailed      └─ NoTables    └─ UnknownSchema
//! ```

use crate::config::ExtractionConfig;
use crate::convert::{AutoSource, MarkdownSource, VisionMarkdown};
use crate::error::GazetteError;
use crate::output::{Extraction, ExtractionMode, ExtractionStats};
use crate::pipeline::{normalize, rows, segment};
use crate::schema::{ColumnSchema, SchemaRegistry};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the text stages over already converted markdown.
///
/// `schema` is the layout to reconstruct rows with; `None` means the
/// document's layout is unknown and only the text is returned.
pub fn parse_markdown(identifier: &str, markdown: &str, schema: Option<&ColumnSchema>) -> Extraction {
    let start = Instant::now();
    let text = normalize::normalize(markdown);
    let segmentation = segment::segment(&text);
    let blocks = segmentation.blocks();

    let mut stats = ExtractionStats {
        table_blocks: blocks.len(),
        ..Default::default()
    };

    let (mode, parsed) = match (segmentation.has_tables(), schema) {
        (false, _) => {
            info!("{}: no tables detected, returning text", identifier);
            (ExtractionMode::NoTables, None)
        }
        (true, None) => {
            info!("{}: no registered schema, returning text", identifier);
            (ExtractionMode::UnknownSchema, None)
        }
        (true, Some(schema)) => (ExtractionMode::Rows, Some(rows::reconstruct_all(blocks, schema))),
    };

    let (rows, issues) = match parsed {
        Some(parse) => {
            stats.candidate_lines = parse.candidate_lines;
            (parse.rows, parse.issues)
        }
        None => (Vec::new(), Vec::new()),
    };
    stats.rows = rows.len();
    stats.dropped_lines = issues.len();
    stats.duration_ms = start.elapsed().as_millis() as u64;

    if mode == ExtractionMode::Rows {
        info!(
            "{}: {} row(s) from {} table block(s), {} line(s) dropped",
            identifier, stats.rows, stats.table_blocks, stats.dropped_lines
        );
    }

    Extraction {
        identifier: identifier.to_string(),
        mode,
        intro: segmentation.intro().to_string(),
        text,
        rows,
        issues,
        stats,
    }
}

/// [`parse_markdown`] with the schema looked up in `registry`.
pub fn extract_markdown(identifier: &str, markdown: &str, registry: &SchemaRegistry) -> Extraction {
    parse_markdown(identifier, markdown, registry.lookup(identifier))
}

/// Convert `path` with `source`, then parse it with the layout registered
/// for the path in `registry`.
pub async fn extract_document(
    path: &Path,
    source: &impl MarkdownSource,
    registry: &SchemaRegistry,
) -> Result<Extraction, GazetteError> {
    let identifier = path.to_string_lossy();
    extract_document_with_schema(path, source, registry.lookup(&identifier)).await
}

/// Convert `path` with `source`, then parse it with an explicit layout.
///
/// # Errors
/// Any converter failure is reported as [`GazetteError::ConversionFailed`]
/// carrying `path`, except [`GazetteError::EmptyDocument`], which is
/// returned as-is.
pub async fn extract_document_with_schema(
    path: &Path,
    source: &impl MarkdownSource,
    schema: Option<&ColumnSchema>,
) -> Result<Extraction, GazetteError> {
    info!("Extracting {}", path.display());
    let markdown = source
        .to_markdown(path)
        .await
        .map_err(|e| conversion_failure(path, e))?;
    debug!("{}: {} chars of markdown", path.display(), markdown.len());

    let extraction = parse_markdown(&path.to_string_lossy(), &markdown, schema);
    if extraction.is_empty() {
        warn!(
            "No text extracted from {}; the document may be image-based",
            path.display()
        );
    }
    Ok(extraction)
}

fn conversion_failure(path: &Path, err: GazetteError) -> GazetteError {
    match err {
        GazetteError::ConversionFailed { .. } | GazetteError::EmptyDocument { .. } => err,
        other => GazetteError::ConversionFailed {
            path: path.to_path_buf(),
            detail: other.to_string(),
        },
    }
}

/// Extract a PDF or pre-converted markdown file with the built-in layouts.
///
/// # Example
/// ```rust,no_run
/// use edgequake_gazette::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let extraction = extract("data/diathesi.pdf", &config).await?;
/// for row in &extraction.rows {
///     println!("{}", row.to_text_block());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Extraction, GazetteError> {
    let source = AutoSource::new(config.clone());
    extract_document(input.as_ref(), &source, SchemaRegistry::builtin()).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Extraction, GazetteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GazetteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input, config))
}

/// Extract a PDF held in memory.
///
/// `identifier` selects the layout (e.g. `"diathesi.pdf"`) and names the
/// document in the result; the bytes go through a managed [`tempfile`] that
/// is removed on return.
pub async fn extract_pdf_bytes(
    identifier: &str,
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<Extraction, GazetteError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| GazetteError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| GazetteError::Internal(format!("tempfile write: {e}")))?;

    let markdown = VisionMarkdown::new(config.clone())
        .to_markdown(tmp.path())
        .await
        .map_err(|e| conversion_failure(Path::new(identifier), e))?;

    Ok(extract_markdown(identifier, &markdown, SchemaRegistry::builtin()))
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a
/// crash never leaves a half-written output.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), GazetteError> {
    let write_err = |e| GazetteError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::StaticMarkdown;

    fn ab() -> ColumnSchema {
        ColumnSchema::new(["A", "B"])
    }

    struct Broken;

    impl MarkdownSource for Broken {
        async fn to_markdown(&self, path: &Path) -> Result<String, GazetteError> {
            Err(GazetteError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "broken xref".into(),
            })
        }
    }

    #[test]
    fn intro_and_one_row() {
        let ex = parse_markdown("doc", "Intro para\n|A|B|\n|---|---|\n|1|2|\n", Some(&ab()));
        assert_eq!(ex.mode, ExtractionMode::Rows);
        assert_eq!(ex.intro, "Intro para");
        assert_eq!(ex.rows.len(), 1);
        assert_eq!(ex.rows[0].get("A"), Some("1"));
        assert_eq!(ex.rows[0].get("B"), Some("2"));
        assert!(ex.issues.is_empty());
        assert_eq!(ex.stats.table_blocks, 1);
    }

    #[test]
    fn plain_text_is_all_intro() {
        let ex = parse_markdown("doc", "\n  Απόφαση χωρίς πίνακα.\nΔεύτερη γραμμή.\n\n", Some(&ab()));
        assert_eq!(ex.mode, ExtractionMode::NoTables);
        assert_eq!(ex.intro, "Απόφαση χωρίς πίνακα.\nΔεύτερη γραμμή.");
        assert!(ex.rows.is_empty());
        assert_eq!(ex.stats.table_blocks, 0);
    }

    #[test]
    fn short_line_is_dropped_not_fatal() {
        let ex = parse_markdown("doc", "Intro\n|A|B|\n|---|---|\n|x|\n", Some(&ab()));
        assert!(ex.rows.is_empty());
        assert_eq!(ex.issues.len(), 1);
        assert_eq!(ex.stats.dropped_lines, 1);
        assert!(!ex.has_rows());
    }

    #[test]
    fn unknown_schema_returns_normalised_text() {
        let ex = parse_markdown("doc", "Ο ΢ΥΛΛΟΓΟΣ\n|A|B|\n|---|---|\n|1|2|\n", None);
        assert_eq!(ex.mode, ExtractionMode::UnknownSchema);
        assert!(ex.rows.is_empty());
        assert!(ex.text.starts_with("Ο ΣΥΛΛΟΓΟΣ"));
        assert_eq!(ex.intro, "Ο ΣΥΛΛΟΓΟΣ");
    }

    #[test]
    fn registry_lookup_uses_file_name() {
        let registry = SchemaRegistry::empty().with_entry("layout.pdf", ab());
        let ex = extract_markdown("inbox/layout.pdf", "x\n|A|B|\n|---|---|\n|1|2|\n", &registry);
        assert_eq!(ex.mode, ExtractionMode::Rows);
        assert_eq!(ex.rows.len(), 1);
    }

    #[tokio::test]
    async fn converter_errors_become_conversion_failures() {
        let err = extract_document(Path::new("data/diathesi.pdf"), &Broken, SchemaRegistry::builtin())
            .await
            .unwrap_err();
        match err {
            GazetteError::ConversionFailed { path, detail } => {
                assert_eq!(path, Path::new("data/diathesi.pdf"));
                assert!(detail.contains("broken xref"));
            }
            other => panic!("expected ConversionFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_document_passes_through() {
        let err = conversion_failure(
            Path::new("scan.pdf"),
            GazetteError::EmptyDocument {
                path: "scan.pdf".into(),
            },
        );
        assert!(matches!(err, GazetteError::EmptyDocument { .. }));
    }

    #[tokio::test]
    async fn static_source_with_explicit_schema() {
        let source = StaticMarkdown("Intro\n|A|B|\n|---|---|\n|1|2|\n|3|4|\n".into());
        let ex = extract_document_with_schema(Path::new("any.md"), &source, Some(&ab()))
            .await
            .unwrap();
        assert_eq!(ex.identifier, "any.md");
        assert_eq!(ex.rows.len(), 2);
        assert_eq!(ex.rows[1].get("A"), Some("3"));
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("fields.txt");
        write_atomic(&out, "ΕΠΩΝΥΜΟ: ΠΑΠΑΣ\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "ΕΠΩΝΥΜΟ: ΠΑΠΑΣ\n");
        assert!(!out.with_file_name("fields.txt.tmp").exists());
    }
}
