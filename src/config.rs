//! Configuration for document extraction.
//!
//! Every knob, including provider credentials selection, lives in one
//! [`ExtractionConfig`] value that is passed explicitly into the conversion
//! and field-extraction calls. Nothing is read from process-wide mutable
//! state except the provider API keys, which `edgequake-llm` looks up from
//! the environment when a provider is created.

use crate::error::GazetteError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Upper bound on [`ExtractionConfig::max_retries`].
pub const MAX_RETRIES: u32 = 10;

/// Configuration for converting and extracting one document.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_gazette::{ExtractionConfig, RowSelection};
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .model("gpt-4.1-mini")
///     .rows(RowSelection::Range(3, 16))
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for page rasterisation. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest rendered edge in pixels. Default: 2000.
    ///
    /// Gazette tables are set in 7–8 pt type; below ~1800 px the VLM starts
    /// misreading digits in registry numbers.
    pub max_rendered_pixels: u32,

    /// Maximum concurrent LLM calls (pages or rows). Default: 4.
    pub concurrency: usize,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum retry attempts per LLM call. Range: 0–10. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call LLM timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page-transcription prompt override. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,

    /// Sampling temperature for page transcription. Default: 0.1.
    pub page_temperature: f32,

    /// Max output tokens per transcribed page. Default: 8192.
    ///
    /// A full page of an appointment table is 40–60 rows of 10+ cells.
    pub page_max_tokens: usize,

    /// Field-extraction prompt override. If None, uses the built-in prompt.
    pub field_prompt: Option<String>,

    /// Sampling temperature for field extraction. Default: 0.7.
    pub field_temperature: f32,

    /// Max output tokens per row's field extraction. Default: 4096.
    pub field_max_tokens: usize,

    /// Rows sent to field extraction. Default: all.
    pub rows: RowSelection,

    /// Progress events for the field-extraction stage.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            system_prompt: None,
            page_temperature: 0.1,
            page_max_tokens: 8192,
            field_prompt: None,
            field_temperature: 0.7,
            field_max_tokens: 4096,
            rows: RowSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("page_temperature", &self.page_temperature)
            .field("page_max_tokens", &self.page_max_tokens)
            .field("field_temperature", &self.field_temperature)
            .field("field_max_tokens", &self.field_max_tokens)
            .field("rows", &self.rows)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn page_temperature(mut self, t: f32) -> Self {
        self.config.page_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn page_max_tokens(mut self, n: usize) -> Self {
        self.config.page_max_tokens = n;
        self
    }

    pub fn field_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.field_prompt = Some(prompt.into());
        self
    }

    pub fn field_temperature(mut self, t: f32) -> Self {
        self.config.field_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn field_max_tokens(mut self, n: usize) -> Self {
        self.config.field_max_tokens = n;
        self
    }

    pub fn rows(mut self, selection: RowSelection) -> Self {
        self.config.rows = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, GazetteError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(GazetteError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(GazetteError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(GazetteError::InvalidConfig(format!(
                "Max retries must be ≤ {MAX_RETRIES}, got {}",
                c.max_retries
            )));
        }
        if c.page_max_tokens == 0 || c.field_max_tokens == 0 {
            return Err(GazetteError::InvalidConfig(
                "Max tokens must be ≥ 1".into(),
            ));
        }
        if let RowSelection::Range(start, end) = c.rows {
            if start == 0 || start > end {
                return Err(GazetteError::InvalidConfig(format!(
                    "Invalid row range {start}-{end}: rows are 1-indexed and start must be <= end"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Which reconstructed rows to send to field extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSelection {
    /// Every row (default).
    #[default]
    All,
    /// A single row (1-indexed).
    Single(usize),
    /// A contiguous range of rows (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific rows (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl RowSelection {
    /// Expand into a sorted, deduplicated list of 0-indexed row positions.
    pub fn to_indices(&self, total_rows: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            RowSelection::All => (0..total_rows).collect(),
            RowSelection::Single(r) => {
                if *r >= 1 && *r <= total_rows {
                    vec![r - 1]
                } else {
                    vec![]
                }
            }
            RowSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_rows);
                (s..e).collect()
            }
            RowSelection::Set(rows) => rows
                .iter()
                .filter(|&&r| r >= 1 && r <= total_rows)
                .map(|r| r - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
