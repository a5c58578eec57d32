//! Client-side screening for spreadsheet uploads.
//!
//! The extension check is a cheap pre-filter run before any network call.
//! The parsing endpoint remains the authority on whether a file is usable.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FileHandle;

// ── Constants ────────────────────────────────────────────────────────

/// File extensions accepted by the intake step (lowercase, no dot).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Advertised upload limit. Only a UI hint: larger files are still sent
/// and the server decides.
pub const MAX_ADVERTISED_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of preview rows the wizard keeps for display.
pub const MAX_PREVIEW_ROWS: usize = 5;

// ── Types ────────────────────────────────────────────────────────────

/// The spreadsheet flavour inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadsheetKind {
    Csv,
    Xlsx,
    Xls,
}

impl SpreadsheetKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
        }
    }
}

/// One raw row of the parser's sample, as returned by the server.
///
/// Display only; never used for decisions.
pub type PreviewRow = serde_json::Value;

/// Output of a successful upload: everything the Upload step hands to the
/// controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_handle: FileHandle,
    pub file_name: String,
    /// Column names in file order.
    pub columns: Vec<String>,
    #[serde(default)]
    pub preview_rows: Vec<PreviewRow>,
}

// ── Pure Functions ───────────────────────────────────────────────────

/// Lowercase extension of `file_name` without the dot, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < base.len() => Some(base[pos + 1..].to_lowercase()),
        _ => None,
    }
}

/// Reject anything that is not a recognised spreadsheet extension.
pub fn screen_file_name(file_name: &str) -> Result<SpreadsheetKind, CoreError> {
    let invalid = || CoreError::InvalidFileType {
        file_name: file_name.to_string(),
    };
    match file_extension(file_name).as_deref() {
        Some("csv") => Ok(SpreadsheetKind::Csv),
        Some("xlsx") => Ok(SpreadsheetKind::Xlsx),
        Some("xls") => Ok(SpreadsheetKind::Xls),
        _ => Err(invalid()),
    }
}

/// Full local screening of a file about to be uploaded.
///
/// An empty file is rejected outright. Oversize files pass; use
/// [`exceeds_advertised_size`] to decide whether to warn.
pub fn screen_file(file_name: &str, size_bytes: u64) -> Result<SpreadsheetKind, CoreError> {
    let kind = screen_file_name(file_name)?;
    if size_bytes == 0 {
        return Err(CoreError::Validation(format!("File '{file_name}' is empty")));
    }
    Ok(kind)
}

/// Returns `true` if the file is larger than the advertised limit.
pub fn exceeds_advertised_size(size_bytes: u64) -> bool {
    size_bytes > MAX_ADVERTISED_FILE_SIZE_BYTES
}

/// Check the structural sanity of a parser response before the session
/// accepts it: at least one column, no blank or repeated column names.
pub fn validate_uploaded_file(file: &UploadedFile) -> Result<(), CoreError> {
    if file.file_handle.as_str().is_empty() {
        return Err(CoreError::Validation(
            "Upload response did not include a file handle".to_string(),
        ));
    }
    if file.columns.is_empty() {
        return Err(CoreError::Validation(format!(
            "No columns were detected in '{}'",
            file.file_name
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for column in &file.columns {
        if column.trim().is_empty() {
            return Err(CoreError::Validation(
                "Column names must not be blank".to_string(),
            ));
        }
        if !seen.insert(column.as_str()) {
            return Err(CoreError::Validation(format!(
                "Column '{column}' appears more than once"
            )));
        }
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
