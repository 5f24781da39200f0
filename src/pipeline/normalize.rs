//! Greek text normalisation: repair systematic glyph-mapping errors.
//!
//! PDFs produced by the gazette toolchain embed fonts whose ToUnicode maps
//! are off by one or two code points for a handful of Greek letters, so
//! text extraction returns `ΣΣ` for `ΣΤ`, `΢` (an unassigned code point) for
//! `Σ`, `ζ` for `ε` in some ligatures, and so on. The errors are systematic,
//! which means a small ordered list of literal substitutions repairs them.
//!
//! ## Rule Order
//!
//! The literal rules run in [`CORRECTIONS`] order and later rules depend on
//! earlier ones: `ΣΣ → ΣΤ` must run before `ΣΤ → ΣΥ`, and `ΕΥΗ → ΕΤΗ`
//! undoes the over-eager `ΕΤ → ΕΥ` inside `ΕΤΗ` (έτη, "years").
//! After the literals, two contextual rules restore the final-sigma
//! orthography: `ς` is only valid as the last letter of a word, `σ` never is.

use tracing::debug;

/// Ordered literal corrections: `(wrong, right)`.
///
/// Order is significant. Add new rules where they belong in the chain, not
/// simply at the end.
pub const CORRECTIONS: &[(&str, &str)] = &[
    ("ΣΣ", "ΣΤ"),
    ("Σσ", "Τσ"),
    ("΢", "Σ"),
    ("ΟΤ", "ΟΥ"),
    ("ΕΤ", "ΕΥ"),
    ("ΣΤ", "ΣΥ"),
    ("ΝΤ", "ΝΥ"),
    ("ϊ", "ω"),
    ("μζ", "με"),
    ("ζγγ", "εγγ"),
    ("ζξ", "εξ"),
    ("αριιμ", "αριθμ"),
    ("ΛΤΓ", "ΛΥΓ"),
    ("ΕΥΗ", "ΕΤΗ"),
    ("ΓΤ", "ΓΥ"),
    ("ΣΠΤΡ", "ΣΠΥΡ"),
    ("ΘΤΜ", "ΘΥΜ"),
    ("ιήι", "ιθι"),
    ("Τπ", "Υπ"),
    ("άιμ", "άθμ"),
    ("χφε", "χυε"),
];

const FINAL_SIGMA: char = 'ς';
const MEDIAL_SIGMA: char = 'σ';

/// Upper bound on correction passes before [`normalize`] gives up.
///
/// Every known input settles after one or two passes.
const MAX_PASSES: usize = 8;

/// Normalise extracted gazette text.
///
/// Runs [`correction_pass`] until the text no longer changes, so the result
/// is a fixed point: `normalize(normalize(s)) == normalize(s)`.
/// A later rule can recreate an earlier rule's trigger (`΢σ` becomes `Σσ`
/// only after the `΢` rule has run), which a single pass would leave behind.
pub fn normalize(input: &str) -> String {
    let mut current = correction_pass(input);
    for pass in 1..MAX_PASSES {
        let next = correction_pass(&current);
        if next == current {
            debug!("Normalisation settled after {} pass(es)", pass);
            return current;
        }
        current = next;
    }
    debug!("Normalisation stopped after {} passes", MAX_PASSES);
    current
}

/// One pass of every literal correction followed by the two sigma rules.
pub fn correction_pass(input: &str) -> String {
    let mut text = input.to_string();
    for (wrong, right) in CORRECTIONS {
        if text.contains(wrong) {
            text = text.replace(wrong, right);
        }
    }
    let text = medial_sigma_inside_words(&text);
    final_sigma_at_word_end(&text)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `ς` followed by another word character becomes `σ`.
fn medial_sigma_inside_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == FINAL_SIGMA && chars.peek().is_some_and(|&n| is_word_char(n)) {
            out.push(MEDIAL_SIGMA);
        } else {
            out.push(c);
        }
    }
    out
}

/// `σ` at the end of a word (followed by a non-word character or the end of
/// the text) becomes `ς`.
fn final_sigma_at_word_end(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == MEDIAL_SIGMA && !chars.peek().is_some_and(|&n| is_word_char(n)) {
            out.push(FINAL_SIGMA);
        } else {
            out.push(c);
        }
    }
    out
}
