//! Column schemas: which positional column names a document's tables use.
//!
//! Each gazette layout the crate knows how to parse is registered here by
//! document file name. Table headers in the source PDFs are abbreviated,
//! split across `<br>` and differ between issues of the same decision type,
//! so the mapping is maintained by hand instead of being inferred from the
//! header row. Supporting a new layout means adding one entry, either to
//! [`BUILTIN_LAYOUTS`] or to a JSON file loaded with
//! [`SchemaRegistry::from_json_file`].

use crate::error::GazetteError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Ordered column names for one table layout.
///
/// The i-th table cell maps to the i-th column. Names are expected to be
/// unique; a repeated name keeps the later cell's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSchema(Vec<String>);

impl ColumnSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Layouts taught so far: `(document file name, columns)`.
pub const BUILTIN_LAYOUTS: &[(&str, &[&str])] = &[
    (
        "diorismos_monimwn.pdf",
        &[
            "Α/Α",
            "Επώνυμο",
            "Όνομα",
            "Πατρώνυμο",
            "Κλάδος",
            "Μόρια",
            "Σειρά",
            "Περιφέρεια",
            "Δ.Υ.Π.Ε.",
            "Αριθμός Βεβαίωσης ΔΙΠΑΑΔ",
            "Αριθμός Βεβαίωσης",
        ],
    ),
    (
        "proslipsi_anaplhrwtwn.pdf",
        &[
            "A/A",
            "A/A ΡΟΗΣ",
            "Επώνυμο",
            "Όνομα",
            "Πατρώνυμο",
            "Ειδικότητα",
            "Κλάδος",
            "Τριτεκνος",
            "Πίνακας",
            "Σείρα Πίνακα",
            "Μορια Πίνακα",
            "Περιοχή Τοποθέτησης",
        ],
    ),
    (
        "anaplhrwtes_eep_ebp.pdf",
        &[
            "A/A",
            "A/A ΡΟΗΣ",
            "Τύπος",
            "Επώνυμο",
            "Όνομα",
            "Πατρώνυμο",
            "Κλάδος",
            "Σείρα Πίνακα",
            "Περιοχή Πρόσληψης",
            "Διευθυνση Εκπαίδευσης",
        ],
    ),
    (
        "monimos_eep_ebp.pdf",
        &[
            "A/A",
            "Σειρά Διορισμού",
            "Επώνυμο",
            "Όνομα",
            "Πατρώνυυμο",
            "Κλάδος Διορισμού",
            "Σειρά Πίνακα",
            "Περιοχή/ΣΔΕΥ Διορισμού",
            "ΔΠΕ/ΔΔΕ/ΠΔΕ",
            "Τυπος Κενου",
            "Αρ. Βεβ. Εγγραφής στο Μητρώο Ανθρώπινου Δυναμικού Ελληνικού Δημοσίου",
            "Αρ. βεβ. ΔΙΠΑΑΔ/Υπουργείου Εσωτερικών",
        ],
    ),
    (
        "topothethisi_monimou.pdf",
        &[
            "A/A",
            "Αριθμός Μητρώου",
            "Επώνυμο",
            "Όνομα",
            "Όνομα Πατρός",
            "Οργανικι θέση",
            "Σύνολο Μορίων",
            "Δήμος ή Κοινότητα εντοπιότητας",
            "Μόρια Εντοπ",
            "Δήμος ή Κοινώτητα Εργασίας Συζύγου",
            "Μόρια Συνθπ",
            "Ειδική Κατηγορία",
            "Σχολείο Οριστικής Τοποθέτησης",
        ],
    ),
    (
        "tpothetisi_anaplhrwtwn.pdf",
        &[
            "Επώνυμο",
            "Όνομα",
            "Κλάδος",
            "Μόρια Πίνακα",
            "ΣΧΟΛΕΙΟ Τοποθέτησης",
            "ΣΧΟΛΕΙΟ 1ης Διαθεσης",
            "ΣΧΟΛΕΙΟ 2ης Διαθεσης",
        ],
    ),
    (
        "topothetisi_monimou_ksanthis.pdf",
        &[
            "A/A",
            "ΕΠΩΝΥΜΟ",
            "ΟΝΟΜΑ",
            "ΠΑΤΡΩΝΥΜΟ",
            "ΚΛΑΔΟΥ",
            "ΣΧΟΛΕΙΟ ΝΕΑΣ ΟΡΓΑΝΙΚΗΣ",
        ],
    ),
    (
        "diathesi.pdf",
        &[
            "A/A",
            "ΕΠΩΝΥΜΟ",
            "ΟΝΟΜΑ",
            "ΚΛΑΔΟΣ",
            "ΣΧΟΛΕΙΟ ΟΡΓΑΝΙΚΗΣ/ΠΡΟΣΩΡΙΝΗΣ ΤΟΠΟΘΕΤΗΣΗΣ",
            "ΣΧΟΛΕΙΟ ΔΙΑΘΕΣΗΣ ΓΙΑ ΣΥΜΠΛΗΡΩΣΗ ΩΡΑΡΙΟΥ",
            "ΩΡΕΣ ΣΥΜΠΛΗΡΩΣΗΣ",
        ],
    ),
];

static BUILTIN: Lazy<SchemaRegistry> = Lazy::new(|| {
    BUILTIN_LAYOUTS
        .iter()
        .fold(SchemaRegistry::empty(), |registry, (id, cols)| {
            registry.with_entry(*id, ColumnSchema::new(cols.iter().copied()))
        })
});

/// Immutable map from document identifier to [`ColumnSchema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, ColumnSchema>,
}

impl SchemaRegistry {
    /// The process-wide registry of built-in layouts.
    pub fn builtin() -> &'static SchemaRegistry {
        &BUILTIN
    }

    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the schema for `identifier`.
    pub fn with_entry(mut self, identifier: impl Into<String>, schema: ColumnSchema) -> Self {
        self.entries.insert(identifier.into(), schema);
        self
    }

    /// Built-in layouts overlaid with the entries of a JSON object
    /// `{ "identifier": ["column", ...], ... }`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let extra: BTreeMap<String, ColumnSchema> = serde_json::from_str(json)?;
        Ok(extra
            .into_iter()
            .fold(Self::builtin().clone(), |registry, (id, schema)| {
                registry.with_entry(id, schema)
            }))
    }

    /// Like [`SchemaRegistry::from_json_str`], reading the JSON from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GazetteError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GazetteError::SchemaFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let registry = Self::from_json_str(&json).map_err(|e| GazetteError::SchemaFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        debug!("Loaded schema registry from {}", path.display());
        Ok(registry)
    }

    /// Schema registered for a document path or name.
    ///
    /// Tries the identifier as given, then its file name (so `data/x.pdf`
    /// finds `x.pdf`), then that file name with a `.pdf` extension (so a
    /// pre-converted `x.md` finds `x.pdf`).
    pub fn lookup(&self, identifier: &str) -> Option<&ColumnSchema> {
        if let Some(schema) = self.entries.get(identifier) {
            return Some(schema);
        }
        let path = Path::new(identifier);
        let file_name = path.file_name()?.to_str()?;
        if let Some(schema) = self.entries.get(file_name) {
            return Some(schema);
        }
        let as_pdf = Path::new(file_name).with_extension("pdf");
        self.entries.get(as_pdf.to_str()?)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_layout() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_LAYOUTS.len());
        let diathesi = registry.lookup("diathesi.pdf").expect("registered");
        assert_eq!(diathesi.len(), 7);
        assert_eq!(diathesi.columns()[0], "A/A");
        assert_eq!(diathesi.columns()[6], "ΩΡΕΣ ΣΥΜΠΛΗΡΩΣΗΣ");
    }

    #[test]
    fn lookup_by_path_and_by_converted_name() {
        let registry = SchemaRegistry::builtin();
        let by_name = registry.lookup("diorismos_monimwn.pdf");
        assert!(by_name.is_some());
        assert_eq!(registry.lookup("data/diorismos_monimwn.pdf"), by_name);
        assert_eq!(registry.lookup("outputs/diorismos_monimwn.md"), by_name);
        assert_eq!(by_name.map(ColumnSchema::len), Some(11));
    }

    #[test]
    fn unknown_identifier_has_no_schema() {
        let registry = SchemaRegistry::builtin();
        assert!(registry.lookup("data/perilipsi_anaplirwth_meiwmenou.pdf").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn json_entries_extend_and_override_builtins() {
        let json = r#"{
            "nea_apofasi.pdf": ["A/A", "ΕΠΩΝΥΜΟ"],
            "diathesi.pdf": ["ΕΠΩΝΥΜΟ"]
        }"#;
        let registry = SchemaRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), BUILTIN_LAYOUTS.len() + 1);
        assert_eq!(
            registry.lookup("nea_apofasi.pdf"),
            Some(&ColumnSchema::new(["A/A", "ΕΠΩΝΥΜΟ"]))
        );
        assert_eq!(registry.lookup("diathesi.pdf").map(ColumnSchema::len), Some(1));
        // The process-wide registry is untouched.
        assert_eq!(SchemaRegistry::builtin().lookup("diathesi.pdf").map(ColumnSchema::len), Some(7));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(SchemaRegistry::from_json_str(r#"{"x.pdf": "A/A"}"#).is_err());
    }

    #[test]
    fn schema_file_errors_name_the_path() {
        let err = SchemaRegistry::from_json_file("/nonexistent/schemas.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schemas.json"));
    }
}
