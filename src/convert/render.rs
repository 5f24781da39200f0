//! PDF input validation and page rasterisation via pdfium.
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to drive
//! from async contexts, so rendering runs inside `spawn_blocking`.
//! The library is bound from `PDFIUM_LIB_PATH` when set, otherwise from the
//! system loader path.

use crate::config::ExtractionConfig;
use crate::error::GazetteError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Check that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), GazetteError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => GazetteError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => GazetteError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(GazetteError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    debug!("Validated PDF input: {}", path.display());
    Ok(())
}

/// Rasterise every page of the PDF.
///
/// Returns `(page_index_0based, image)` pairs in page order.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<(usize, DynamicImage)>, GazetteError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| GazetteError::Internal(format!("Render task panicked: {}", e)))?
}

fn bind_pdfium() -> Result<Pdfium, GazetteError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| GazetteError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<(usize, DynamicImage)>, GazetteError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password.is_some(), format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let width_px = target_width(page.width().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| GazetteError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push((idx, image));
    }

    Ok(results)
}

/// Pixel width for a page `width_pt` points wide at `dpi`, capped at
/// `max_pixels`.
fn target_width(width_pt: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_pt / 72.0 * dpi as f32).round() as i32;
    px.clamp(1, max_pixels as i32)
}

fn classify_load_error(path: &Path, had_password: bool, detail: String) -> GazetteError {
    if detail.to_lowercase().contains("password") {
        if had_password {
            GazetteError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            GazetteError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        GazetteError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}
