//! LLM provider resolution and the retrying chat call shared by page
//! transcription and field extraction.
//!
//! ## Retry Strategy
//!
//! 429 / 503 responses are transient under concurrent load. Each attempt is
//! bounded by `api_timeout_secs`; failures back off exponentially
//! (`retry_backoff_ms * 2^(attempt-1)`), so with the defaults the waits are
//! 500 ms → 1 s → 2 s.

use crate::config::ExtractionConfig;
use crate::error::GazetteError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// A successful chat call.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
}

/// Why a chat call gave up.
#[derive(Debug, Clone)]
pub enum ChatFailure {
    /// The last attempt timed out.
    Timeout { secs: u64 },
    /// The last attempt returned an error.
    Failed { detail: String },
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`: a pre-built provider, used as-is
/// 2. `config.provider_name` (+ `config.model`) via
///    [`ProviderFactory::create_llm_provider`]
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. [`ProviderFactory::from_env`] auto-detection from API key variables
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, GazetteError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GazetteError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, GazetteError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GazetteError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Send `messages`, retrying failures and timeouts per `config`.
///
/// `label` identifies the call in logs (e.g. `"Page 3"`, `"Row 12"`).
pub async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    config: &ExtractionConfig,
    label: &str,
) -> Result<ChatOutcome, ChatFailure> {
    let start = Instant::now();
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_failure = ChatFailure::Failed {
        detail: "Unknown error".to_string(),
    };

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(messages, Some(options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    label, response.prompt_tokens, response.completion_tokens, duration
                );
                return Ok(ChatOutcome {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: u8::try_from(attempt).unwrap_or(u8::MAX),
                });
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                last_failure = ChatFailure::Failed {
                    detail: e.to_string(),
                };
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    label,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_failure = ChatFailure::Timeout {
                    secs: config.api_timeout_secs,
                };
            }
        }
    }

    Err(last_failure)
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Completion options for a call with the given sampling settings.
pub fn completion_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_sampling_settings() {
        let opts = completion_options(0.7, 4096);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(500, 70), u64::MAX);
    }
}
