//! Progress-callback trait for the field-extraction stage.
//!
//! Field extraction makes one model call per row and easily runs for
//! minutes on a full appointment list. Inject an
//! [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! per-row events, e.g. to drive a terminal progress bar.
//!
//! The trait is `Send + Sync`: with `concurrency > 1` row events arrive from
//! several tasks at once.

use std::sync::Arc;

/// Called by [`crate::fields::extract_fields`] as it processes each row.
///
/// All methods default to no-ops so implementors override only what they
/// need.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any row is sent, with the number of selected rows.
    fn on_extraction_start(&self, total_rows: usize) {
        let _ = total_rows;
    }

    /// Called just before the model request for a row is sent.
    ///
    /// `row_num` is the 1-based position in the extraction's row list.
    fn on_row_start(&self, row_num: usize, total_rows: usize) {
        let _ = (row_num, total_rows);
    }

    /// Called when a row's response arrived.
    fn on_row_complete(&self, row_num: usize, total_rows: usize, response_len: usize) {
        let _ = (row_num, total_rows, response_len);
    }

    /// Called when a row failed after all retries.
    fn on_row_error(&self, row_num: usize, total_rows: usize, error: &str) {
        let _ = (row_num, total_rows, error);
    }

    /// Called once after every selected row has been attempted.
    fn on_extraction_complete(&self, total_rows: usize, success_count: usize) {
        let _ = (total_rows, success_count);
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
