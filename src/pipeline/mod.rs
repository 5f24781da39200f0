//! Text stages that turn converted markdown into structured rows.
//!
//! Each submodule implements exactly one transformation step and is a pure
//! function of its input, so every stage is testable on plain strings
//! without a PDF or a model.
//!
//! ## Data Flow
//!
//! ```text
//! markdown ──▶ normalize ──▶ segment ──▶ rows
//!              (glyph fixes)  (intro +     (schema-driven
//!                             table blocks) records)
//! ```
//!
//! 1. [`normalize`]: repair Greek glyph-mapping errors left by PDF text
//!    extraction
//! 2. [`segment`]: split the document into intro text and raw pipe-table
//!    blocks
//! 3. [`rows`]: map table cells onto a [`crate::schema::ColumnSchema`],
//!    dropping header, separator and malformed lines

pub mod normalize;
pub mod rows;
pub mod segment;
