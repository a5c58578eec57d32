//! Validation summary returned by the remote validation endpoint.
//!
//! The client does not know how duplicates are detected. It only relies on
//! the shape below: one [`DuplicateCandidate`] per row, optionally pointing
//! at an existing contact, with the fields on which the two disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, RowIndex};

/// Incoming and stored values of one disagreeing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingValue {
    pub incoming: Option<String>,
    pub existing: Option<String>,
}

/// Validation outcome for one uploaded row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub source_row_index: RowIndex,
    /// Existing contact the server considers a likely duplicate.
    #[serde(default)]
    pub matched_contact_id: Option<DbId>,
    /// Field name to disagreeing values.
    #[serde(default)]
    pub conflicting_fields: BTreeMap<String, ConflictingValue>,
    /// Problems unrelated to duplication (e.g. malformed email).
    #[serde(default)]
    pub row_errors: Vec<String>,
}

impl DuplicateCandidate {
    pub fn is_duplicate(&self) -> bool {
        self.matched_contact_id.is_some()
    }

    pub fn has_errors(&self) -> bool {
        !self.row_errors.is_empty()
    }
}

/// Where a row lands in the resolver's presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowBucket {
    /// Row has errors but no duplicate; it succeeds or fails on its own at
    /// commit time.
    ErrorsOnly,
    /// Row matches an existing contact and needs a merge decision.
    Duplicate,
    /// Row needs no operator input.
    Clean,
}

impl RowBucket {
    pub fn of(candidate: &DuplicateCandidate) -> Self {
        if candidate.is_duplicate() {
            Self::Duplicate
        } else if candidate.has_errors() {
            Self::ErrorsOnly
        } else {
            Self::Clean
        }
    }
}

/// Rows of a summary split by [`RowBucket`], each in summary order.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub errors_only: Vec<&'a DuplicateCandidate>,
    pub duplicates: Vec<&'a DuplicateCandidate>,
    pub clean: Vec<&'a DuplicateCandidate>,
}

/// Validation result for one file under one column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Fingerprint of the mapping the summary was computed for.
    pub mapping_fingerprint: String,
    pub rows: Vec<DuplicateCandidate>,
}

impl ValidationSummary {
    pub fn new(mapping_fingerprint: impl Into<String>, rows: Vec<DuplicateCandidate>) -> Self {
        Self {
            mapping_fingerprint: mapping_fingerprint.into(),
            rows,
        }
    }

    pub fn partition(&self) -> Partition<'_> {
        let mut partition = Partition::default();
        for row in &self.rows {
            match RowBucket::of(row) {
                RowBucket::ErrorsOnly => partition.errors_only.push(row),
                RowBucket::Duplicate => partition.duplicates.push(row),
                RowBucket::Clean => partition.clean.push(row),
            }
        }
        partition
    }

    /// Candidates that require a merge decision, in summary order.
    pub fn duplicates(&self) -> impl Iterator<Item = &DuplicateCandidate> {
        self.rows.iter().filter(|r| r.is_duplicate())
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates().count()
    }

    pub fn candidate(&self, row: RowIndex) -> Option<&DuplicateCandidate> {
        self.rows.iter().find(|r| r.source_row_index == row)
    }
}
