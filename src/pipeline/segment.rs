//! Markdown table segmentation: split a document into intro text and raw
//! pipe-table blocks.
//!
//! Two independent scans run over the same text:
//!
//! 1. The first header-separator line (`|---|---|`) fixes the end of the
//!    introductory text: everything before the header row that precedes it.
//! 2. Every maximal run of consecutive pipe-delimited lines becomes one
//!    [`TableBlock`]. Header and separator rows stay inside the blocks; the
//!    row reconstructor drops them.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A contiguous run of pipe-delimited lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// 1-based line number of the block's first line in the source text.
    pub first_line: usize,
    /// The block's lines, each terminated by `\n`.
    pub text: String,
}

impl TableBlock {
    /// Number of lines in the block.
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Result of segmenting a normalised document.
///
/// `NoTables` is distinct from `Tables` with an empty block list: callers
/// branch on whether a header separator exists at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// No header-separator line: the whole (trimmed) text is intro.
    NoTables { intro: String },
    /// A header separator was found.
    Tables {
        intro: String,
        blocks: Vec<TableBlock>,
    },
}

impl Segmentation {
    pub fn intro(&self) -> &str {
        match self {
            Segmentation::NoTables { intro } | Segmentation::Tables { intro, .. } => intro,
        }
    }

    pub fn blocks(&self) -> &[TableBlock] {
        match self {
            Segmentation::NoTables { .. } => &[],
            Segmentation::Tables { blocks, .. } => blocks,
        }
    }

    pub fn has_tables(&self) -> bool {
        matches!(self, Segmentation::Tables { .. })
    }
}

/// Split normalised text into intro text and raw table blocks.
pub fn segment(text: &str) -> Segmentation {
    let lines: Vec<&str> = text.lines().collect();

    let Some(sep_idx) = lines.iter().position(|l| is_header_separator(l)) else {
        debug!("No table header separator found");
        return Segmentation::NoTables {
            intro: text.trim().to_string(),
        };
    };

    // The header row sits directly above the separator; the intro ends
    // before it.
    let intro = lines[..sep_idx.saturating_sub(1)].join("\n").trim().to_string();
    let blocks = table_blocks(&lines);
    debug!(
        "Header separator on line {}, {} table block(s)",
        sep_idx + 1,
        blocks.len()
    );

    Segmentation::Tables { intro, blocks }
}

/// Every maximal run of consecutive table lines.
fn table_blocks(lines: &[&str]) -> Vec<TableBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<TableBlock> = None;

    for (idx, line) in lines.iter().enumerate() {
        if is_table_line(line) {
            let block = current.get_or_insert_with(|| TableBlock {
                first_line: idx + 1,
                text: String::new(),
            });
            block.text.push_str(line.trim_end());
            block.text.push('\n');
        } else if let Some(block) = current.take() {
            blocks.push(block);
        }
    }
    blocks.extend(current);
    blocks
}

/// A line that starts and ends with `|`.
pub fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// A markdown header-divider row: starts with `|`, holds only `|`, `-`,
/// `:` and spaces, and at least one dash.
pub fn is_header_separator(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.starts_with('|') && trimmed.contains('-') && is_separator_row(trimmed)
}

/// A row made only of `|`, `-`, `:` and whitespace.
pub fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|')
        && trimmed
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c.is_whitespace())
}
