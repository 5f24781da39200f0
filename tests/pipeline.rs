//! Integration tests for the text pipeline through the public API.
//!
//! These drive pre-converted markdown (on-disk fixtures and in-memory
//! sources), so they need neither pdfium nor an LLM API key.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_gazette::pipeline::normalize::normalize;
use edgequake_gazette::{
    extract, extract_document, extract_document_with_schema, write_atomic, ColumnSchema,
    ExtractionConfig, ExtractionMode, ExtractionProgressCallback, GazetteError, MarkdownFile,
    NoopProgressCallback, SchemaRegistry, StaticMarkdown, TableIssue,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

const DIATHESI_MD: &str = "ΑΠΟΦΑΣΗ
΢ΧΟΛΙΚΕΣ ΜΟΝΑΔΕΣ της Διεύθυνσησ

|A/A|ΕΠΩΝΥΜΟ|ΟΝΟΜΑ|ΚΛΑΔΟΣ|ΣΧΟΛΕΙΟ ΟΡΓΑΝΙΚΗΣ|ΣΧΟΛΕΙΟ ΔΙΑΘΕΣΗΣ|ΩΡΕΣ|
|---|---|---|---|---|---|---|
|1|ΠΑΠΑΔΑΚΗΣ|ΜΑΡΙΑ|ΠΕ02|1ο ΓΥΜΝΑΣΙΟ ΞΑΝΘΗΣ|2ο ΛΥΚΕΙΟ ΞΑΝΘΗΣ|6|
|συνέχεια|
|2|ΓΕΩΡΓΙΟΥ|ΝΙΚΟΣ|ΠΕ03|ΓΕΛ ΑΒΔΗΡΩΝ|ΓΥΜΝΑΣΙΟ ΑΒΔΗΡΩΝ|4|
";

const DISPOSAL_SCHOOL: &str = "ΣΧΟΛΕΙΟ ΔΙΑΘΕΣΗΣ ΓΙΑ ΣΥΜΠΛΗΡΩΣΗ ΩΡΑΡΙΟΥ";

/// Write `contents` to `name` inside a fresh temp dir.
fn fixture(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    (dir, path)
}

// ── Row reconstruction ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_builtin_layout_from_converted_markdown() {
    let (_dir, path) = fixture("diathesi.md", DIATHESI_MD);

    let ex = extract_document(&path, &MarkdownFile, SchemaRegistry::builtin())
        .await
        .expect("extraction should succeed");

    assert_eq!(ex.mode, ExtractionMode::Rows);
    assert_eq!(ex.intro, "ΑΠΟΦΑΣΗ\nΣΧΟΛΙΚΕΣ ΜΟΝΑΔΕΣ της Διεύθυνσης");
    assert_eq!(ex.rows.len(), 2);
    assert_eq!(ex.rows[0].get("ΕΠΩΝΥΜΟ"), Some("ΠΑΠΑΔΑΚΗΣ"));
    assert_eq!(ex.rows[0].get(DISPOSAL_SCHOOL), Some("2ο ΛΥΚΕΙΟ ΞΑΝΘΗΣ"));
    assert_eq!(ex.rows[1].get("ΩΡΕΣ ΣΥΜΠΛΗΡΩΣΗΣ"), Some("4"));
    assert_eq!(ex.rows[1].len(), 7);

    assert_eq!(ex.issues.len(), 1);
    match &ex.issues[0] {
        TableIssue::MissingCells {
            found,
            expected,
            content,
            ..
        } => {
            assert_eq!(*found, 1);
            assert_eq!(*expected, 7);
            assert_eq!(content, "|συνέχεια|");
        }
    }
    assert_eq!(ex.stats.candidate_lines, 3);
    assert_eq!(ex.stats.dropped_lines, 1);
}

#[tokio::test]
async fn test_extract_picks_markdown_source_by_extension() {
    // No provider is configured: a .md input must never reach the VLM path.
    let (_dir, path) = fixture("diathesi.md", DIATHESI_MD);
    let ex = extract(&path, &ExtractionConfig::default())
        .await
        .expect("markdown input needs no provider");
    assert!(ex.has_rows());
    assert_eq!(ex.stats.rows, 2);
}

#[tokio::test]
async fn test_unregistered_document_returns_text() {
    let (_dir, path) = fixture("fek_b_1234.md", DIATHESI_MD);
    let ex = extract_document(&path, &MarkdownFile, SchemaRegistry::builtin())
        .await
        .unwrap();
    assert_eq!(ex.mode, ExtractionMode::UnknownSchema);
    assert!(ex.rows.is_empty());
    assert!(ex.text.contains("|2|ΓΕΩΡΓΙΟΥ|"));
    assert!(ex.text.contains("Διεύθυνσης"));
}

#[tokio::test]
async fn test_schema_override_for_unregistered_name() {
    let (_dir, path) = fixture("fek_b_1234.md", DIATHESI_MD);
    let schema = SchemaRegistry::builtin().lookup("diathesi.pdf");
    assert!(schema.is_some());
    let ex = extract_document_with_schema(&path, &MarkdownFile, schema)
        .await
        .unwrap();
    assert_eq!(ex.rows.len(), 2);
}

#[tokio::test]
async fn test_json_registry_adds_layout() {
    let (_dir, schemas) = fixture("layouts.json", r#"{ "short.pdf": ["Α/Α", "ΕΠΩΝΥΜΟ"] }"#);
    let registry = SchemaRegistry::from_json_file(&schemas).expect("valid registry");
    assert_eq!(registry.len(), SchemaRegistry::builtin().len() + 1);

    let source = StaticMarkdown("Πίνακας\n|Α/Α|ΕΠΩΝΥΜΟ|\n|:--|:--|\n|1|ΑΛΕΞΙΟΥ|\n".into());
    let ex = extract_document(Path::new("inbox/short.pdf"), &source, &registry)
        .await
        .unwrap();
    assert_eq!(ex.rows.len(), 1);
    assert_eq!(ex.rows[0].get("ΕΠΩΝΥΜΟ"), Some("ΑΛΕΞΙΟΥ"));
}

// ── Text fallback and failures ───────────────────────────────────────────────

#[test]
fn test_document_without_tables_is_all_intro() {
    let source = StaticMarkdown("\n  Ανακοίνωση χωρίς πίνακα.\n\n".into());
    let ex = tokio_test::block_on(extract_document(
        Path::new("diathesi.pdf"),
        &source,
        SchemaRegistry::builtin(),
    ))
    .unwrap();
    assert_eq!(ex.mode, ExtractionMode::NoTables);
    assert_eq!(ex.intro, "Ανακοίνωση χωρίς πίνακα.");
    assert!(ex.rows.is_empty());
}

#[tokio::test]
async fn test_missing_input_is_conversion_failure_with_path() {
    let err = extract_document(
        Path::new("/nonexistent/diathesi.md"),
        &MarkdownFile,
        SchemaRegistry::builtin(),
    )
    .await
    .unwrap_err();
    match err {
        GazetteError::ConversionFailed { ref path, .. } => {
            assert_eq!(path, Path::new("/nonexistent/diathesi.md"));
            assert!(err.to_string().contains("/nonexistent/diathesi.md"));
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_file_is_empty_extraction() {
    let (_dir, path) = fixture("diathesi.md", "");
    let ex = extract_document(&path, &MarkdownFile, SchemaRegistry::builtin())
        .await
        .unwrap();
    assert!(ex.is_empty());
    assert_eq!(ex.mode, ExtractionMode::NoTables);
}

// ── Output ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extraction_json_keeps_column_order() {
    let source = StaticMarkdown(DIATHESI_MD.into());
    let ex = extract_document(Path::new("diathesi.pdf"), &source, SchemaRegistry::builtin())
        .await
        .unwrap();
    let json = serde_json::to_string(&ex).expect("serialisable");
    assert!(json.contains(r#""mode":"rows""#));
    let first = json.find(r#""A/A":"1""#).expect("A/A key");
    let second = json.find(r#""ΕΠΩΝΥΜΟ":"ΠΑΠΑΔΑΚΗΣ""#).expect("surname key");
    assert!(first < second);
}

#[tokio::test]
async fn test_atomic_output_round_trips_through_markdown_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out").join("diathesi.md");
    write_atomic(&out, DIATHESI_MD).await.unwrap();

    let ex = extract_document(&out, &MarkdownFile, SchemaRegistry::builtin())
        .await
        .unwrap();
    assert_eq!(ex.rows.len(), 2);
}

// ── Invariants ───────────────────────────────────────────────────────────────

#[test]
fn test_normalisation_is_idempotent_on_fixture() {
    let once = normalize(DIATHESI_MD);
    assert_eq!(normalize(&once), once);
    assert!(!once.contains('΢'));
}

#[test]
fn test_rows_only_use_schema_columns() {
    let schema = ColumnSchema::new(["A", "B"]);
    let ex = edgequake_gazette::parse_markdown(
        "doc",
        "x\n|A|B|\n|---|---|\n|1|2|3|\n|4|5|\n| | |\n",
        Some(&schema),
    );
    assert_eq!(ex.rows.len(), 2);
    for row in &ex.rows {
        assert!(row.iter().all(|(k, _)| k == "A" || k == "B"));
    }
    assert!(ex.rows.len() <= ex.stats.candidate_lines);
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    let _cb: std::sync::Arc<dyn ExtractionProgressCallback> =
        std::sync::Arc::new(NoopProgressCallback);
}
