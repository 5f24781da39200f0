//! Field extraction: one model call per reconstructed row.
//!
//! Each selected row is rendered as `column: value` lines and sent with the
//! decision's intro text and the field instructions. Responses come back in
//! row order regardless of `concurrency`; a failed row is recorded on its
//! [`FieldResponse`] and the rest carry on.

use crate::config::ExtractionConfig;
use crate::error::{GazetteError, RowError};
use crate::output::{FieldExtraction, FieldResponse, FieldStats};
use crate::pipeline::rows::Row;
use crate::prompts::{field_extraction_message, FIELD_EXTRACTION_PROMPT};
use crate::provider::{chat_with_retry, completion_options, resolve_provider, ChatFailure};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run field extraction over the rows selected by `config.rows`.
///
/// # Errors
/// * [`GazetteError::InvalidConfig`] when the selection matches no row
/// * [`GazetteError::ProviderNotConfigured`] when no provider resolves
/// * [`GazetteError::AllRowsFailed`] when every selected row failed
pub async fn extract_fields(
    intro: &str,
    rows: &[Row],
    config: &ExtractionConfig,
) -> Result<FieldExtraction, GazetteError> {
    let start = Instant::now();
    let indices = config.rows.to_indices(rows.len());
    if indices.is_empty() {
        return Err(GazetteError::InvalidConfig(format!(
            "row selection {:?} matches none of the {} reconstructed row(s)",
            config.rows,
            rows.len()
        )));
    }

    let provider = resolve_provider(config)?;
    let template = config.field_prompt.as_deref().unwrap_or(FIELD_EXTRACTION_PROMPT);
    let options = completion_options(config.field_temperature, config.field_max_tokens);
    let total = indices.len();
    info!("Extracting fields from {} of {} row(s)", total, rows.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total);
    }

    let responses: Vec<FieldResponse> = stream::iter(indices.into_iter().map(|idx| {
        let provider = &provider;
        let options = &options;
        let message = field_extraction_message(intro, template, &rows[idx].to_text_block());
        async move { extract_row(provider, idx + 1, message, options, config, total).await }
    }))
    .buffered(config.concurrency)
    .collect()
    .await;

    let stats = summarise(&responses, total, start.elapsed().as_millis() as u64);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total, stats.processed_rows);
    }

    if stats.processed_rows == 0 {
        let first_error = responses
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(GazetteError::AllRowsFailed {
            total,
            retries: config.max_retries,
            first_error,
        });
    }

    info!(
        "Field extraction complete: {}/{} rows, {}ms",
        stats.processed_rows, total, stats.total_duration_ms
    );
    Ok(FieldExtraction { responses, stats })
}

async fn extract_row(
    provider: &Arc<dyn LLMProvider>,
    row_num: usize,
    message: String,
    options: &CompletionOptions,
    config: &ExtractionConfig,
    total: usize,
) -> FieldResponse {
    if let Some(ref cb) = config.progress_callback {
        cb.on_row_start(row_num, total);
    }

    let messages = [ChatMessage::user(message)];
    let label = format!("Row {row_num}");

    let response = match chat_with_retry(provider, &messages, options, config, &label).await {
        Ok(outcome) => FieldResponse {
            row_num,
            text: outcome.content,
            input_tokens: outcome.input_tokens,
            output_tokens: outcome.output_tokens,
            duration_ms: outcome.duration_ms,
            retries: outcome.retries,
            error: None,
        },
        Err(failure) => {
            let error = row_error(row_num, config.max_retries, failure);
            warn!("{}", error);
            FieldResponse {
                row_num,
                text: String::new(),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms: 0,
                retries: u8::try_from(config.max_retries).unwrap_or(u8::MAX),
                error: Some(error),
            }
        }
    };

    if let Some(ref cb) = config.progress_callback {
        match &response.error {
            None => cb.on_row_complete(row_num, total, response.text.len()),
            Some(e) => cb.on_row_error(row_num, total, &e.to_string()),
        }
    }
    response
}

fn row_error(row: usize, retries: u32, failure: ChatFailure) -> RowError {
    match failure {
        ChatFailure::Timeout { secs } => RowError::Timeout { row, secs },
        ChatFailure::Failed { detail } => RowError::LlmFailed {
            row,
            retries: u8::try_from(retries).unwrap_or(u8::MAX),
            detail,
        },
    }
}

fn summarise(responses: &[FieldResponse], selected: usize, duration_ms: u64) -> FieldStats {
    let processed = responses.iter().filter(|r| r.error.is_none()).count();
    FieldStats {
        selected_rows: selected,
        processed_rows: processed,
        failed_rows: responses.len() - processed,
        total_input_tokens: responses.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: responses.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: duration_ms,
    }
}
