//! CLI binary for edgequake-gazette.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the extraction and prints or writes results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_gazette::{
    extract_document_with_schema, extract_fields, write_atomic, AutoSource, ColumnSchema,
    Extraction, ExtractionConfig, ExtractionMode, ExtractionProgressCallback, ProgressCallback,
    RowSelection, SchemaRegistry,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar for the field-extraction stage. Rows complete in order, but
/// with `concurrency > 1` several are in flight at once.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, row_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&row_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_rows: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} rows  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_rows as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn on_row_start(&self, row_num: usize, _total_rows: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(row_num, Instant::now());
        }
        self.bar.set_message(format!("row {row_num}"));
    }

    fn on_row_complete(&self, row_num: usize, total_rows: usize, response_len: usize) {
        let secs = self.elapsed_secs(row_num);
        self.bar.println(format!(
            "  {} Row {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            row_num,
            total_rows,
            dim(&format!("{response_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_row_error(&self, row_num: usize, total_rows: usize, error: &str) {
        let secs = self.elapsed_secs(row_num);
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Row {:>3}/{:<3}  {}  {}",
            red("✗"),
            row_num,
            total_rows,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_rows: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} rows extracted", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} rows extracted  ({} failed)",
                yellow("⚠"),
                bold(&success_count.to_string()),
                total_rows,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Reconstruct table rows from a gazette PDF (layout chosen by file name)
  gazette data/diathesi.pdf

  # Rerun the text stages on an already converted document
  gazette outputs/diathesi.md --json > diathesi.json

  # Use a registered layout for a file with another name
  gazette --schema-for topothethisi_monimou.pdf scans/fek_b_1234.pdf

  # Add layouts from a JSON file: { "my_layout.pdf": ["Α/Α", "ΕΠΩΝΥΜΟ", ...] }
  gazette --schemas layouts.json my_layout.pdf

  # Per-row field extraction for rows 3-16, written to a file
  gazette --fields --rows 3-16 data/diathesi.pdf --fields-output fields.txt

  # Print the normalised text only
  gazette --text-only data/diathesi.pdf

BUILT-IN LAYOUTS:
  diorismos_monimwn.pdf           proslipsi_anaplhrwtwn.pdf
  anaplhrwtes_eep_ebp.pdf         monimos_eep_ebp.pdf
  topothethisi_monimou.pdf        tpothetisi_anaplhrwtwn.pdf
  topothetisi_monimou_ksanthis.pdf  diathesi.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (default: system library path)
  RUST_LOG                Log filter, e.g. edgequake_gazette=debug
"#;

/// Extract structured personnel records from Greek government-gazette PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "gazette",
    version,
    about = "Extract structured personnel records from Greek government-gazette PDFs",
    long_about = "Convert a gazette PDF to markdown with a vision LLM, repair Greek character \
substitutions, and rebuild table rows against the layout registered for the document. \
Optionally run per-row field extraction with an LLM.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF, or an already converted .md/.txt document.
    input: PathBuf,

    /// Use the layout registered under this identifier instead of the input's name.
    #[arg(long, env = "GAZETTE_SCHEMA_FOR")]
    schema_for: Option<String>,

    /// JSON file with extra layouts: { "identifier": ["column", ...] }.
    #[arg(long, env = "GAZETTE_SCHEMAS")]
    schemas: Option<PathBuf>,

    /// Print the normalised text instead of rows.
    #[arg(long, env = "GAZETTE_TEXT_ONLY", conflicts_with = "fields")]
    text_only: bool,

    /// Run per-row field extraction with the LLM.
    #[arg(long, env = "GAZETTE_FIELDS")]
    fields: bool,

    /// Rows to send for field extraction: all, 5, 3-16, or 1,3,5.
    #[arg(long, env = "GAZETTE_ROWS", default_value = "all")]
    rows: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "GAZETTE_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent LLM calls.
    #[arg(short, long, env = "GAZETTE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per page/row on LLM failure (0-10).
    #[arg(long, env = "GAZETTE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "GAZETTE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "GAZETTE_PASSWORD")]
    password: Option<String>,

    /// Text file with a custom page-transcription prompt.
    #[arg(long, env = "GAZETTE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Text file with a custom field-extraction prompt (use {row} for the record).
    #[arg(long, env = "GAZETTE_FIELD_PROMPT")]
    field_prompt: Option<PathBuf>,

    /// Write rows / text to this file instead of stdout.
    #[arg(short, long, env = "GAZETTE_OUTPUT")]
    output: Option<PathBuf>,

    /// Write field-extraction responses to this file instead of stdout.
    #[arg(long, env = "GAZETTE_FIELDS_OUTPUT")]
    fields_output: Option<PathBuf>,

    /// Output structured JSON instead of text.
    #[arg(long, env = "GAZETTE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GAZETTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GAZETTE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", red("error:"), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Layout ───────────────────────────────────────────────────────────
    let custom_registry;
    let registry: &SchemaRegistry = match cli.schemas {
        Some(ref path) => {
            custom_registry = SchemaRegistry::from_json_file(path)?;
            &custom_registry
        }
        None => SchemaRegistry::builtin(),
    };
    let schema = select_schema(&cli, registry)?;

    // ── Extraction ───────────────────────────────────────────────────────
    let show_progress = cli.fields && !cli.quiet && !cli.json;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let source = AutoSource::new(config.clone());
    let extraction = extract_document_with_schema(&cli.input, &source, schema)
        .await
        .context("Extraction failed")?;

    if extraction.is_empty() && !cli.quiet {
        eprintln!(
            "{} No text extracted from {}. The document might be image-based.",
            yellow("⚠"),
            cli.input.display()
        );
    }
    if !cli.quiet {
        print_summary(&extraction);
    }

    if cli.fields {
        return run_fields(&cli, &extraction, &config).await;
    }

    let rendered = if cli.json {
        serde_json::to_string_pretty(&extraction).context("Failed to serialise extraction")? + "\n"
    } else if cli.text_only || extraction.mode != ExtractionMode::Rows {
        ensure_newline(extraction.text.clone())
    } else {
        render_rows(&extraction)
    };
    emit(cli.output.as_deref(), &rendered).await
}

async fn run_fields(cli: &Cli, extraction: &Extraction, config: &ExtractionConfig) -> Result<()> {
    if !extraction.has_rows() {
        anyhow::bail!(
            "No rows to extract fields from ({:?}); check the layout with --schema-for",
            extraction.mode
        );
    }

    let fields = extract_fields(&extraction.intro, &extraction.rows, config)
        .await
        .context("Field extraction failed")?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&fields).context("Failed to serialise field responses")? + "\n"
    } else {
        fields.combined()
    };
    emit(cli.fields_output.as_deref(), &rendered).await?;

    if !cli.quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&fields.stats.total_input_tokens.to_string()),
            dim(&fields.stats.total_output_tokens.to_string()),
            fields.stats.total_duration_ms,
        );
    }
    Ok(())
}

fn select_schema<'a>(cli: &Cli, registry: &'a SchemaRegistry) -> Result<Option<&'a ColumnSchema>> {
    match cli.schema_for {
        Some(ref id) => registry.lookup(id).map(Some).with_context(|| {
            format!(
                "No layout registered for '{}'. Known: {}",
                id,
                registry.identifiers().join(", ")
            )
        }),
        None => Ok(registry.lookup(&cli.input.to_string_lossy())),
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .rows(parse_rows(&cli.rows)?);

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref path) = cli.system_prompt {
        builder = builder.system_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.field_prompt {
        builder = builder.field_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

/// Parse `--rows` into `RowSelection`.
fn parse_rows(s: &str) -> Result<RowSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(RowSelection::All);
    }

    // Range: "3-16"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start row in range")?;
        let end: usize = end.trim().parse().context("Invalid end row in range")?;
        if start < 1 {
            anyhow::bail!("Rows are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid row range '{}-{}': start must be <= end", start, end);
        }
        return Ok(RowSelection::Range(start, end));
    }

    // Set: "1,3,5"
    if s.contains(',') {
        let rows: Vec<usize> = s
            .split(',')
            .map(|r| {
                r.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid row number: '{}'", r.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if rows.contains(&0) {
            anyhow::bail!("Rows are 1-indexed, minimum is 1 (got 0)");
        }
        return Ok(RowSelection::Set(rows));
    }

    // Single row: "5"
    let row: usize = s.parse().context("Invalid row number")?;
    if row < 1 {
        anyhow::bail!("Rows are 1-indexed, minimum is 1 (got {})", row);
    }
    Ok(RowSelection::Single(row))
}

/// One `column: value` block per row, blank line between rows.
fn render_rows(extraction: &Extraction) -> String {
    extraction
        .rows
        .iter()
        .map(|row| row.to_text_block() + "\n")
        .collect::<Vec<_>>()
        .join("\n")
}

fn ensure_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

fn print_summary(extraction: &Extraction) {
    let stats = &extraction.stats;
    match extraction.mode {
        ExtractionMode::Rows => {
            eprintln!(
                "{}  {} rows from {} table block(s)  {}",
                if stats.dropped_lines == 0 { green("✔") } else { yellow("⚠") },
                bold(&stats.rows.to_string()),
                stats.table_blocks,
                dim(&format!("{} line(s) dropped", stats.dropped_lines)),
            );
            for issue in &extraction.issues {
                eprintln!("   {}", dim(&issue.to_string()));
            }
        }
        ExtractionMode::NoTables => {
            eprintln!("{}  No tables detected; printing normalised text", yellow("⚠"));
        }
        ExtractionMode::UnknownSchema => {
            eprintln!(
                "{}  No layout registered for '{}'; printing normalised text",
                yellow("⚠"),
                extraction.identifier
            );
        }
    }
}

/// Write to `path` atomically, or to stdout.
async fn emit(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            write_atomic(path, contents).await?;
            eprintln!("   → {}", bold(&path.display().to_string()));
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(contents.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_selection_forms() {
        assert_eq!(parse_rows("all").unwrap(), RowSelection::All);
        assert_eq!(parse_rows("7").unwrap(), RowSelection::Single(7));
        assert_eq!(parse_rows("3-16").unwrap(), RowSelection::Range(3, 16));
        assert_eq!(parse_rows("1, 3,5").unwrap(), RowSelection::Set(vec![1, 3, 5]));
    }

    #[test]
    fn row_selection_rejects_bad_input() {
        assert!(parse_rows("0").is_err());
        assert!(parse_rows("9-2").is_err());
        assert!(parse_rows("a,b").is_err());
    }
}
