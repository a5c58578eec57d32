//! Commit preview and terminal import summary.

use serde::{Deserialize, Serialize};

use crate::merge::{MergeAction, MergeDecision};
use crate::types::RowIndex;
use crate::validation::ValidationSummary;

// ── Commit result ────────────────────────────────────────────────────

/// A row the commit endpoint rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    pub row_index: RowIndex,
    pub reason: String,
}

/// Outcome of a successful commit call.
///
/// Partial success is expressed here: rows in `row_failures` were rejected
/// by the server, which is different from rows the operator skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: u64,
    pub updated: u64,
    pub skipped: u64,
    #[serde(default)]
    pub row_failures: Vec<RowFailure>,
}

impl ImportResult {
    /// Rows the server reports as handled in any way.
    /// Saturates at `u64::MAX`.
    pub fn rows_accounted(&self) -> u64 {
        self.handled()
            .unwrap_or(u64::MAX)
            .saturating_add(self.row_failures.len() as u64)
    }

    /// `true` if the counts do not exceed the number of rows submitted.
    /// Counts whose sum overflows are inconsistent.
    pub fn is_consistent_with(&self, total_rows: usize) -> bool {
        self.handled().is_some_and(|n| n <= total_rows as u64)
    }

    fn handled(&self) -> Option<u64> {
        self.imported
            .checked_add(self.updated)?
            .checked_add(self.skipped)
    }
}

/// What the terminal screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub updated: u64,
    /// Rows left out by operator choice.
    pub skipped: u64,
    /// Rows rejected by the server.
    pub failed: u64,
    pub failures: Vec<RowFailure>,
}

impl From<&ImportResult> for ImportSummary {
    fn from(result: &ImportResult) -> Self {
        Self {
            imported: result.imported,
            updated: result.updated,
            skipped: result.skipped,
            failed: result.row_failures.len() as u64,
            failures: result.row_failures.clone(),
        }
    }
}

impl ImportSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Imported: {}", self.imported)?;
        writeln!(f, "Updated: {}", self.updated)?;
        write!(f, "Skipped: {}", self.skipped)?;
        if self.has_failures() {
            write!(f, "\nFailed: {}", self.failed)?;
            for failure in &self.failures {
                write!(f, "\n  row {}: {}", failure.row_index, failure.reason)?;
            }
        }
        Ok(())
    }
}

// ── Preview ──────────────────────────────────────────────────────────

/// Expected effect of the commit, shown on the Preview step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportPreview {
    pub total_rows: usize,
    /// Rows with no matching contact.
    pub to_create: usize,
    /// Duplicates resolved with Overwrite or MergeFields.
    pub to_update: usize,
    /// Duplicates the operator chose to skip.
    pub to_skip: usize,
    /// Rows carrying validation errors; the server may reject them.
    pub with_errors: usize,
    pub tag_count: usize,
}

impl ImportPreview {
    pub fn build(summary: &ValidationSummary, decisions: &[MergeDecision], tag_count: usize) -> Self {
        let mut preview = Self {
            total_rows: summary.rows.len(),
            tag_count,
            ..Self::default()
        };
        for row in &summary.rows {
            if row.has_errors() {
                preview.with_errors += 1;
            }
            if !row.is_duplicate() {
                preview.to_create += 1;
            }
        }
        for decision in decisions {
            match decision.action() {
                MergeAction::Skip => preview.to_skip += 1,
                MergeAction::Overwrite | MergeAction::MergeFields => preview.to_update += 1,
            }
        }
        preview
    }
}
