//! Prompts for page transcription and per-row field extraction.
//!
//! Both prompts live here so a wording change touches exactly one place and
//! unit tests can inspect them without a model. Callers override them via
//! [`crate::config::ExtractionConfig::system_prompt`] and
//! [`crate::config::ExtractionConfig::field_prompt`].

/// System prompt for transcribing one gazette page image to Markdown.
///
/// The table rules matter most: the row reconstructor expects one record per
/// line and `|`-delimited cells, with in-cell line breaks kept as `<br>`.
pub const PAGE_SYSTEM_PROMPT: &str = r#"You are transcribing a page of the Greek Government Gazette (ΦΕΚ) or of an administrative decision into Markdown.

Follow these rules precisely:

1. TEXT
   - Transcribe ALL text exactly as printed, in Greek, keeping accents and final sigma (ς)
   - Keep the reading order of the page
   - Do not translate, summarise or correct names, numbers or dates

2. TABLES
   - Render every table as a GFM pipe table: |cell|cell|cell|
   - Start and end every table line with a pipe character
   - One table row per line; never split a record across lines
   - If a cell's text wraps over several printed lines, join them with <br>
   - Keep empty cells as empty (||), never drop a column
   - Emit the header row followed by a |---|---| separator row

3. WHAT TO IGNORE
   - Page numbers, running headers and footers
   - Signatures, stamps and decorative lines

4. OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap in ```markdown fences
   - Do NOT add commentary"#;

/// Instructions for splitting one table record into ontology fields.
///
/// The placeholder `{row}` is replaced with the row's `column: value` lines.
pub const FIELD_EXTRACTION_PROMPT: &str = r#"Please analyze the following document content:

<document_content>
{row}
</document_content>

Separate the piece of <Greek text> extracted from a position assignment decision exclusively into fields with the following <Format>, taking into account the <Descriptions> of the fields. Return the result exclusively using the provided <Format>.

<Format>:
Person has_last_name <Last_Name>
Person has_first_name <First_Name>
Person has_father's_name <Father's_Name>
Employment has_"ID"_employee_number <"ID"_Employee_Number>
Position_assignment_<N> has_from_date <From_Date>
Position_assignment_<N> has_thru_date <Thru_Date>
Position_assignment_<N> has_position_assignment_type <Position_Assignment_Type>
Position_<M> has_kind_of_position <Kind_Of_Position>
Position_<M> has_status <Status>
Position_<M> has_working_hours_per_week <Working_Hours_Per_Week>
Position_Type has_title <Title>
Position_Type has_branch <Branch>
Position_Type has_specialization <Specialization>
Position_Type is_designated_for_education_type <Education_Type>
Position_Type has_standard_hours_per_week <Standard_Hours_Per_Week>
Position_Type entails_employment_relationship <Employment_Relationship>
Government_agency_<Z> has_name <Name>

Where <N> is the number of the Position Assignment.
Where <M> is the number of the Position.
Where <Z> is the number of the Government Agency.

<Descriptions>:
Last name: <The one and only one last name of a person>
First name: <The one and only one first name of a person>
Father's name: <The one and only one father's name of a person>
"ID" employee number: <The one and only one six-digit "ID" number of an employee. This number may not appear in some decisions.>
From date: <The one and only one date that the position assignment starts.>
Thru date: <The one and only one date that the position assignment ends. The end of the academic year ("διδακτικό έτος") is "30/06/YYYY", while the end of the school year ("σχολικό έτος") is "31/08/YYYY".>
Position assignment type: <The one and only one type of position assignment. Allowed values: "Τοποθέτηση", "Μετάθεση εντός ΠΥΣΔΕ", "Οριστική Τοποθέτηση", "Διάθεση", "Μετάταξη">
Kind of position: <The one and only one kind of position, depending on whether it is permanent or temporary. Allowed values: Οργανική, Λειτουργική ανάγκη, Διδακτική ανάγκη>
Status: <The one and only one status of a position depending on whether it is vacant or filled. Allowed values: Κενή, Καλυμμένη>
Working hours per week: <The number of hours a teacher works per week>
Title: <The one and only one title of a position type. Allowed values: Εκπαιδευτικός πρωτοβάθμιας εκπαίδευσης, Εκπαιδευτικός δευτεροβάθμιας εκπαίδευσης, Εκπαιδευτικός πρωτοβάθμιας και δευτεροβάθμιας εκπαίδευσης, Ειδικό Εκπαιδευτικό Προσωπικό (ΕΕΠ), Ειδικό Βοηθητικό Προσωπικό (ΕΒΠ)>
Branch: <The one and only one branch in which a position is classified>
Specialization: <The one and only one specialization in which a position is classified>
Education type: <The one and only one education type for which a position is designated. Allowed values: Γενική Εκπαίδευση, Ειδική Αγωγή και Εκπαίδευση>
Standard hours per week: <The number of hours an employee is typically scheduled to work in a week. Allowed values: "Πλήρους ωραρίου", "Μειωμένου ωραρίου">
Employment relationship: <The one and only one employment relationship entailed by the position. Allowed values: Μόνιμος, Μόνιμος με διετή δοκιμαστική θητεία, Προσωρινός αναπληρωτής με σχέση εργασίας Ιδιωτικού Δικαίου Ορισμένου Χρόνου, Ωρομίσθιος>
Name: <The one and only one name of the government agency that defines the position (e.g. "ΕΠΑΛ ΝΙΚΗΤΗΣ")>"#;

/// Build the user message for one row: the decision's intro text followed
/// by the field instructions with the row filled in.
///
/// `template` must contain `{row}`; a template without it gets the row
/// appended instead so the model still sees the record.
pub fn field_extraction_message(intro: &str, template: &str, row_block: &str) -> String {
    let instructions = if template.contains("{row}") {
        template.replace("{row}", row_block)
    } else {
        format!("{template}\n\n{row_block}")
    };
    format!("{} {}", intro.trim(), instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_prompt_demands_single_line_rows() {
        assert!(PAGE_SYSTEM_PROMPT.contains("One table row per line"));
        assert!(PAGE_SYSTEM_PROMPT.contains("<br>"));
    }

    #[test]
    fn field_message_embeds_intro_and_row() {
        let msg = field_extraction_message(
            "  Απόφαση τοποθέτησης\n",
            FIELD_EXTRACTION_PROMPT,
            "ΕΠΩΝΥΜΟ: ΠΑΠΑΔΟΠΟΥΛΟΣ",
        );
        assert!(msg.starts_with("Απόφαση τοποθέτησης Please analyze"));
        assert!(msg.contains("<document_content>\nΕΠΩΝΥΜΟ: ΠΑΠΑΔΟΠΟΥΛΟΣ\n</document_content>"));
        assert!(!msg.contains("{row}"));
    }

    #[test]
    fn template_without_placeholder_gets_row_appended() {
        let msg = field_extraction_message("intro", "Extract fields.", "A: 1");
        assert_eq!(msg, "intro Extract fields.\n\nA: 1");
    }
}
