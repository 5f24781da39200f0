//! Deterministic cleanup of VLM page transcriptions.
//!
//! Even with explicit instructions models occasionally wrap the page in
//! ` ```markdown ` fences, emit CRLF, leave zero-width characters copied from
//! the PDF text layer, or pad the page with blank lines. Those artefacts
//! would break table-line detection downstream (a line ending in `|\r` is
//! not a table line), so they are removed here, before normalisation.
//!
//! Rules run in this order: strip fences, normalise line endings, trim
//! trailing whitespace, drop invisible code points, collapse blank runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one page of VLM output. The result has no leading or trailing
/// blank lines.
pub fn clean_page_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Zero-width space/joiners, BOM, soft hyphen, word joiner.
fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}
