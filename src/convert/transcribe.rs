//! Page transcription: rendered page image → markdown via a vision LLM.
//!
//! Pages are sent as lossless base64 PNG with `detail: "high"`; gazette
//! tables are small print and JPEG artefacts or a low-detail tile lose
//! digits in registry numbers.

use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::prompts::PAGE_SYSTEM_PROMPT;
use crate::provider::{chat_with_retry, completion_options, ChatFailure};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, ImageData, LLMProvider};
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Transcription result for one page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number.
    pub page_num: usize,
    pub markdown: String,
    pub error: Option<PageError>,
}

/// Encode a rasterised page as a base64 PNG ready for the VLM API.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Transcribe one page. Never fails: errors are recorded on the result so
/// one bad page does not abort the document.
pub async fn transcribe_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    img: &DynamicImage,
    config: &ExtractionConfig,
) -> PageText {
    let image_data = match encode_page(img) {
        Ok(data) => data,
        Err(e) => {
            return PageText {
                page_num,
                markdown: String::new(),
                error: Some(PageError::EncodeFailed {
                    page: page_num,
                    detail: e.to_string(),
                }),
            }
        }
    };

    let system_prompt = config.system_prompt.as_deref().unwrap_or(PAGE_SYSTEM_PROMPT);
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image_data]),
    ];
    let options = completion_options(config.page_temperature, config.page_max_tokens);
    let label = format!("Page {page_num}");

    match chat_with_retry(provider, &messages, &options, config, &label).await {
        Ok(outcome) => PageText {
            page_num,
            markdown: outcome.content,
            error: None,
        },
        Err(failure) => PageText {
            page_num,
            markdown: String::new(),
            error: Some(page_error(page_num, config.max_retries, failure)),
        },
    }
}

fn page_error(page: usize, retries: u32, failure: ChatFailure) -> PageError {
    match failure {
        ChatFailure::Timeout { secs } => PageError::Timeout { page, secs },
        ChatFailure::Failed { detail } => PageError::LlmFailed {
            page,
            retries: u8::try_from(retries).unwrap_or(u8::MAX),
            detail,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_page() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 8, Rgba([255, 255, 255, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn failures_map_to_page_errors() {
        let e = page_error(4, 3, ChatFailure::Timeout { secs: 120 });
        assert_eq!(e.to_string(), "Page 4: LLM call timed out after 120s");
        let e = page_error(
            5,
            3,
            ChatFailure::Failed {
                detail: "rate limited".into(),
            },
        );
        assert!(e.to_string().contains("after 3 retries: rate limited"));
    }
}
