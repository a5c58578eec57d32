use crate::types::RowIndex;

/// Local contract violations raised by the import domain.
///
/// None of these involve the network: they are detected before a remote
/// call is made (or instead of accepting its result) and always leave the
/// session on the step it was on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported file type for '{file_name}'. Accepted: .csv, .xlsx, .xls")]
    InvalidFileType { file_name: String },

    #[error("Cannot move from step '{from}' to step '{to}'")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Step '{requested}' cannot be completed while the wizard is on step '{current}'")]
    WrongStep {
        current: &'static str,
        requested: &'static str,
    },

    #[error("Merge decision for row {row} is incomplete: no choice for {}", join_fields(.missing))]
    IncompleteMerge { row: RowIndex, missing: Vec<String> },

    #[error("Validation summary was computed for a different column mapping")]
    StaleValidation,
}

fn join_fields(fields: &[String]) -> String {
    fields.join(", ")
}
