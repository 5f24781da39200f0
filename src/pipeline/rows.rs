//! Row reconstruction: turn raw pipe-table blocks into [`Row`] records.
//!
//! Cells map to columns by position only. The markdown header text in
//! gazette PDFs is abbreviated, broken over `<br>` and inconsistent between
//! issues, so the column names always come from the registered
//! [`ColumnSchema`], never from the table itself.

use crate::error::TableIssue;
use crate::pipeline::segment::{is_header_separator, is_separator_row, is_table_line, TableBlock};
use crate::schema::ColumnSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

/// Header + separator pair repeated on every page of the permanent-staff
/// appointment tables (`Α/Α … Αριθμός<br>Βεβαίωσης<br>ΔΙΠΑΑΔ`).
static RE_DIPAAD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\|Α/Α\|.*?\|Αριθμός<br>Βεβαίωσης<br>ΔΙΠΑΑΔ\|\n\|---\|.*?\|---\|\n").unwrap()
});

/// One reconstructed table record: column name → trimmed cell text.
///
/// Keys keep schema order. Serialises as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Set `column` to `value`, replacing an earlier value for the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some((_, v)) => *v = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `column: value` lines, the block handed to the model layer.
    pub fn to_text_block(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::default();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Rows and diagnostics recovered from one or more table blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableParse {
    pub rows: Vec<Row>,
    pub issues: Vec<TableIssue>,
    /// Data lines considered (table lines that are neither header nor
    /// separator rows).
    pub candidate_lines: usize,
}

impl TableParse {
    fn absorb(&mut self, other: TableParse) {
        self.rows.extend(other.rows);
        self.issues.extend(other.issues);
        self.candidate_lines += other.candidate_lines;
    }
}

/// Reconstruct rows from every block, in document order.
pub fn reconstruct_all(blocks: &[TableBlock], schema: &ColumnSchema) -> TableParse {
    let mut parse = TableParse::default();
    for block in blocks {
        parse.absorb(reconstruct(block, schema));
    }
    debug!(
        "Reconstructed {} rows from {} block(s), {} line(s) dropped",
        parse.rows.len(),
        blocks.len(),
        parse.issues.len()
    );
    parse
}

/// Reconstruct rows from a single table block.
///
/// Lines with fewer cells than the schema are dropped and reported as
/// [`TableIssue::MissingCells`]; extra trailing cells are ignored.
pub fn reconstruct(block: &TableBlock, schema: &ColumnSchema) -> TableParse {
    let cleaned = strip_layout_noise(&block.text);
    let lines: Vec<&str> = cleaned.lines().collect();
    let mut parse = TableParse::default();

    // Line numbers only stay exact when no noise was cut out.
    let numbered = cleaned.len() == block.text.len();

    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() || !is_table_line(line) || is_separator_row(line) {
            continue;
        }
        let next_is_divider = lines.get(idx + 1).is_some_and(|next| is_header_separator(next));
        if next_is_divider && starts_table(&lines, idx) {
            debug!("Skipping header row: {}", line);
            continue;
        }
        parse.candidate_lines += 1;

        let cells = split_cells(line);
        if cells.len() < schema.len() {
            let line_no = if numbered { block.first_line + idx } else { 0 };
            warn!(
                "Line has {} columns, expected at least {}: {}",
                cells.len(),
                schema.len(),
                line
            );
            parse.issues.push(TableIssue::MissingCells {
                line: line_no,
                found: cells.len(),
                expected: schema.len(),
                content: line.to_string(),
            });
            continue;
        }

        parse.rows.push(
            schema
                .columns()
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.as_str(), cell.trim()))
                .collect(),
        );
    }

    parse
}

/// Whether `lines[idx]` opens a table run. Only such a line can be a header;
/// a dash-only row after data is an empty-cell row, not a divider.
fn starts_table(lines: &[&str], idx: usize) -> bool {
    idx == 0 || !is_table_line(lines[idx - 1])
}

/// Remove the repeated DIPAAD header block before line splitting.
fn strip_layout_noise(text: &str) -> String {
    RE_DIPAAD_HEADER.replace_all(text, "").into_owned()
}

/// Cells of a `|a|b|c|` line, without the outer pipes.
fn split_cells(line: &str) -> Vec<&str> {
    let inner = line
        .strip_prefix('|')
        .and_then(|l| l.strip_suffix('|'))
        .unwrap_or(line);
    inner.split('|').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> TableBlock {
        TableBlock {
            first_line: 1,
            text: text.to_string(),
        }
    }

    fn schema(cols: &[&str]) -> ColumnSchema {
        ColumnSchema::new(cols.iter().copied())
    }

    #[test]
    fn header_and_separator_are_dropped() {
        let parse = reconstruct(&block("|A|B|\n|---|---|\n|1|2|\n"), &schema(&["A", "B"]));
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].get("A"), Some("1"));
        assert_eq!(parse.rows[0].get("B"), Some("2"));
        assert!(parse.issues.is_empty());
        assert_eq!(parse.candidate_lines, 1);
    }

    #[test]
    fn dash_row_after_data_keeps_the_row_above() {
        let parse = reconstruct(
            &block("|1|ΠΑΠΑΣ|\n|-|-|\n|2|ΝΙΚΟΥ|\n"),
            &schema(&["A", "B"]),
        );
        let names: Vec<&str> = parse.rows.iter().filter_map(|r| r.get("B")).collect();
        assert_eq!(names, ["ΠΑΠΑΣ", "ΝΙΚΟΥ"]);
        assert!(parse.issues.is_empty());
        assert_eq!(parse.candidate_lines, 2);
    }

    #[test]
    fn repeated_header_after_page_break_is_dropped() {
        let text = "|A|B|\n|---|---|\n|1|x|\n\n|A|B|\n|---|---|\n|2|y|\n";
        let parse = reconstruct(&block(text), &schema(&["A", "B"]));
        let ns: Vec<&str> = parse.rows.iter().filter_map(|r| r.get("A")).collect();
        assert_eq!(ns, ["1", "2"]);
    }

    #[test]
    fn one_row_per_data_line() {
        let text = "|1|ΠΑΠΑΔΟΠΟΥΛΟΣ|ΓΙΩΡΓΟΣ|\n|2|ΝΙΚΟΛΑΟΥ|ΜΑΡΙΑ|\n|3|ΚΩΣΤΑΣ|ΕΛΕΝΗ|\n";
        let parse = reconstruct(&block(text), &schema(&["A/A", "ΕΠΩΝΥΜΟ", "ΟΝΟΜΑ"]));
        assert_eq!(parse.rows.len(), 3);
        assert_eq!(parse.rows[1].get("ΕΠΩΝΥΜΟ"), Some("ΝΙΚΟΛΑΟΥ"));
        let keys: Vec<&str> = parse.rows[2].iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["A/A", "ΕΠΩΝΥΜΟ", "ΟΝΟΜΑ"]);
    }

    #[test]
    fn short_line_is_dropped_with_diagnostic() {
        let mut b = block("|1|2|\n|x|\n");
        b.first_line = 10;
        let parse = reconstruct(&b, &schema(&["A", "B"]));
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(
            parse.issues,
            vec![TableIssue::MissingCells {
                line: 11,
                found: 1,
                expected: 2,
                content: "|x|".into(),
            }]
        );
    }

    #[test]
    fn extra_cells_are_truncated() {
        let parse = reconstruct(&block("|1|2|3|4|\n"), &schema(&["A", "B"]));
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].len(), 2);
        assert_eq!(parse.rows[0].get("B"), Some("2"));
    }

    #[test]
    fn cells_are_trimmed_and_may_be_empty() {
        let parse = reconstruct(&block("|  1 |   |  x<br>y |\n"), &schema(&["A", "B", "C"]));
        let row = &parse.rows[0];
        assert_eq!(row.get("A"), Some("1"));
        assert_eq!(row.get("B"), Some(""));
        assert_eq!(row.get("C"), Some("x<br>y"));
    }

    #[test]
    fn separator_rows_never_become_rows() {
        // Same dash-cell count as the schema, still not data.
        let parse = reconstruct(&block("|---|---|\n| :--- | ---: |\n"), &schema(&["A", "B"]));
        assert!(parse.rows.is_empty());
        assert!(parse.issues.is_empty());
        assert_eq!(parse.candidate_lines, 0);
    }

    #[test]
    fn dipaad_header_block_is_removed() {
        let text = "|Α/Α|Επώνυμο|Όνομα|Αριθμός<br>Βεβαίωσης<br>ΔΙΠΑΑΔ|\n|---|---|---|---|\n|1|ΑΛΕΞΙΟΥ|ΝΙΚΟΣ|123/2024|\n";
        let cols = ["Α/Α", "Επώνυμο", "Όνομα", "Αριθμός Βεβαίωσης ΔΙΠΑΑΔ"];
        let parse = reconstruct(&block(text), &schema(&cols));
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].get("Επώνυμο"), Some("ΑΛΕΞΙΟΥ"));
    }

    #[test]
    fn duplicate_column_names_keep_last_value() {
        let parse = reconstruct(&block("|a|b|\n"), &schema(&["X", "X"]));
        assert_eq!(parse.rows[0].len(), 1);
        assert_eq!(parse.rows[0].get("X"), Some("b"));
    }

    #[test]
    fn reconstruct_all_keeps_document_order() {
        let blocks = [block("|1|a|\n"), block("|2|b|\n|3|\n")];
        let parse = reconstruct_all(&blocks, &schema(&["N", "V"]));
        let ns: Vec<&str> = parse.rows.iter().filter_map(|r| r.get("N")).collect();
        assert_eq!(ns, ["1", "2"]);
        assert_eq!(parse.issues.len(), 1);
        assert_eq!(parse.candidate_lines, 3);
    }

    #[test]
    fn row_serialises_as_ordered_object() {
        let row: Row = [("Β", "2"), ("Α", "1")].into_iter().collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Β":"2","Α":"1"}"#);
        assert_eq!(row.to_text_block(), "Β: 2\nΑ: 1");
    }
}
