//! Markdown conversion: turn a source document into one markdown string.
//!
//! The rest of the crate only needs "give me markdown for this path", which
//! is the [`MarkdownSource`] trait. Two sources exist:
//!
//! * [`VisionMarkdown`]: the production path for PDFs: rasterise each page
//!   with pdfium and let a vision LLM transcribe it, tables as GFM pipe rows.
//! * [`MarkdownFile`]: read a document that was already converted (`.md`,
//!   `.txt`), so the text stages can be rerun without pdfium or an API key.
//!
//! [`AutoSource`] picks between the two by file extension.
//!
//! ```text
//! PDF ──▶ render ──▶ transcribe ──▶ cleanup ──▶ markdown
//!        (pdfium)    (VLM/page)     (fences, CRLF, …)
//! ```

pub mod cleanup;
pub mod render;
pub mod transcribe;

use crate::config::ExtractionConfig;
use crate::error::{GazetteError, PageError};
use crate::provider::resolve_provider;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Anything that can produce markdown for a document path.
///
/// Implementations perform a single blocking-style conversion per call and
/// hold no state between calls.
pub trait MarkdownSource {
    fn to_markdown(&self, path: &Path) -> impl Future<Output = Result<String, GazetteError>> + Send;
}

/// Reads an already converted markdown or text file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFile;

impl MarkdownSource for MarkdownFile {
    async fn to_markdown(&self, path: &Path) -> Result<String, GazetteError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GazetteError::FileNotFound {
                    path: path.to_path_buf(),
                },
                std::io::ErrorKind::PermissionDenied => GazetteError::PermissionDenied {
                    path: path.to_path_buf(),
                },
                _ => GazetteError::ConversionFailed {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                },
            })
    }
}

/// Converts PDFs by rasterising pages and transcribing them with a VLM.
#[derive(Debug, Clone)]
pub struct VisionMarkdown {
    config: ExtractionConfig,
}

impl VisionMarkdown {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

impl MarkdownSource for VisionMarkdown {
    async fn to_markdown(&self, path: &Path) -> Result<String, GazetteError> {
        let start = Instant::now();
        render::validate_pdf(path)?;
        let provider = resolve_provider(&self.config)?;

        let rendered = render::render_pages(path, &self.config).await?;
        let total = rendered.len();
        info!("Rendered {} page(s) of {}", total, path.display());

        let pages: Vec<transcribe::PageText> = stream::iter(rendered.into_iter().map(|(idx, img)| {
            let provider = &provider;
            let config = &self.config;
            async move { transcribe::transcribe_page(provider, idx + 1, &img, config).await }
        }))
        .buffered(self.config.concurrency)
        .collect()
        .await;

        let markdown = assemble_pages(path, &pages)?;
        info!(
            "Converted {} in {}ms ({} chars)",
            path.display(),
            start.elapsed().as_millis(),
            markdown.len()
        );
        Ok(markdown)
    }
}

/// Join cleaned page markdown in page order, skipping failed pages.
fn assemble_pages(path: &Path, pages: &[transcribe::PageText]) -> Result<String, GazetteError> {
    let mut parts = Vec::with_capacity(pages.len());
    let mut first_error: Option<&PageError> = None;

    for page in pages {
        match &page.error {
            None => parts.push(cleanup::clean_page_markdown(&page.markdown)),
            Some(e) => {
                warn!("Skipping page {}: {}", page.page_num, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if parts.is_empty() {
        return Err(GazetteError::ConversionFailed {
            path: path.to_path_buf(),
            detail: match first_error {
                Some(e) => format!("all {} page(s) failed; first error: {}", pages.len(), e),
                None => "document has no pages".to_string(),
            },
        });
    }

    if parts.iter().all(|p| p.is_empty()) {
        return Err(GazetteError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    Ok(parts.join("\n\n") + "\n")
}

/// Chooses [`MarkdownFile`] for `.md`/`.markdown`/`.txt` paths and
/// [`VisionMarkdown`] for everything else.
#[derive(Debug, Clone)]
pub struct AutoSource {
    vision: VisionMarkdown,
}

impl AutoSource {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            vision: VisionMarkdown::new(config),
        }
    }
}

/// Whether `path` names a document that is already markdown/text.
pub fn is_pre_converted(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "md" | "markdown" | "txt"))
        .unwrap_or(false)
}

impl MarkdownSource for AutoSource {
    async fn to_markdown(&self, path: &Path) -> Result<String, GazetteError> {
        if is_pre_converted(path) {
            MarkdownFile.to_markdown(path).await
        } else {
            self.vision.to_markdown(path).await
        }
    }
}

/// A fixed markdown string, whatever the path. Handy for tests and for
/// callers that converted the document themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticMarkdown(pub String);

impl MarkdownSource for StaticMarkdown {
    async fn to_markdown(&self, _path: &Path) -> Result<String, GazetteError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_num: usize, markdown: &str, error: Option<&str>) -> transcribe::PageText {
        transcribe::PageText {
            page_num,
            markdown: markdown.to_string(),
            error: error.map(|detail| PageError::LlmFailed {
                page: page_num,
                retries: 3,
                detail: detail.to_string(),
            }),
        }
    }

    #[test]
    fn pre_converted_extensions() {
        assert!(is_pre_converted(Path::new("out/diathesi.md")));
        assert!(is_pre_converted(Path::new("DIATHESI.TXT")));
        assert!(!is_pre_converted(Path::new("data/diathesi.pdf")));
        assert!(!is_pre_converted(Path::new("noext")));
    }

    #[test]
    fn pages_join_in_order_and_skip_failures() {
        let pages = [
            page(1, "```markdown\nΑπόφαση\n```", None),
            page(2, "", Some("timeout")),
            page(3, "|1|2|\r\n", None),
        ];
        let md = assemble_pages(Path::new("x.pdf"), &pages).unwrap();
        assert_eq!(md, "Απόφαση\n\n|1|2|\n");
    }

    #[test]
    fn all_pages_failing_is_a_conversion_failure() {
        let pages = [page(1, "", Some("401 unauthorized"))];
        let err = assemble_pages(Path::new("data/diathesi.pdf"), &pages).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("data/diathesi.pdf"));
        assert!(msg.contains("401 unauthorized"));
    }

    #[test]
    fn blank_transcriptions_are_an_empty_document() {
        let pages = [page(1, "```markdown\n\n```", None), page(2, "  \n", None)];
        let err = assemble_pages(Path::new("scan.pdf"), &pages).unwrap_err();
        assert!(matches!(err, GazetteError::EmptyDocument { .. }));
    }

    #[tokio::test]
    async fn markdown_file_missing_is_file_not_found() {
        let err = MarkdownFile
            .to_markdown(Path::new("/nonexistent/diathesi.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, GazetteError::FileNotFound { .. }));
    }
}
