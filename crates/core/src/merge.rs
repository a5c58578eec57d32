//! Merge decisions for duplicate rows.
//!
//! A [`MergeDecision`] can only be obtained through its constructors, which
//! check it against the [`DuplicateCandidate`] it resolves. A decision that
//! leaves a conflicting field without an explicit choice therefore never
//! exists; the operator's unfinished work lives in a [`MergeDraft`] instead.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, RowIndex};
use crate::validation::{DuplicateCandidate, ValidationSummary};

// ---------------------------------------------------------------------------
// Actions and choices
// ---------------------------------------------------------------------------

/// How a duplicate row is reconciled with the contact it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// Exclude the row from the import.
    Skip,
    /// Every conflicting field takes the incoming value.
    Overwrite,
    /// The operator picks a side per conflicting field.
    MergeFields,
}

impl MergeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::MergeFields => "merge_fields",
        }
    }
}

/// Which value wins for one conflicting field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChoice {
    UseIncoming,
    UseExisting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Resolution {
    Skip,
    Overwrite,
    MergeFields {
        field_choices: BTreeMap<String, FieldChoice>,
    },
}

// ---------------------------------------------------------------------------
// MergeDecision
// ---------------------------------------------------------------------------

/// A complete resolution of one duplicate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeDecision {
    source_row_index: RowIndex,
    matched_contact_id: DbId,
    #[serde(flatten)]
    resolution: Resolution,
}

impl MergeDecision {
    /// Exclude `candidate` from the import.
    pub fn skip(candidate: &DuplicateCandidate) -> Result<Self, CoreError> {
        Self::with_resolution(candidate, Resolution::Skip)
    }

    /// Replace every conflicting field with the incoming value.
    pub fn overwrite(candidate: &DuplicateCandidate) -> Result<Self, CoreError> {
        Self::with_resolution(candidate, Resolution::Overwrite)
    }

    /// Pick a side per field. `choices` must name every field in the
    /// candidate's `conflicting_fields`; extra keys are allowed.
    pub fn merge_fields(
        candidate: &DuplicateCandidate,
        choices: BTreeMap<String, FieldChoice>,
    ) -> Result<Self, CoreError> {
        let missing = missing_choices(candidate, &choices);
        if !missing.is_empty() {
            return Err(CoreError::IncompleteMerge {
                row: candidate.source_row_index,
                missing,
            });
        }
        Self::with_resolution(
            candidate,
            Resolution::MergeFields {
                field_choices: choices,
            },
        )
    }

    fn with_resolution(candidate: &DuplicateCandidate, resolution: Resolution) -> Result<Self, CoreError> {
        let matched_contact_id = candidate.matched_contact_id.ok_or_else(|| {
            CoreError::Validation(format!(
                "Row {} does not match an existing contact and needs no merge decision",
                candidate.source_row_index
            ))
        })?;
        Ok(Self {
            source_row_index: candidate.source_row_index,
            matched_contact_id,
            resolution,
        })
    }

    pub fn source_row_index(&self) -> RowIndex {
        self.source_row_index
    }

    pub fn matched_contact_id(&self) -> DbId {
        self.matched_contact_id
    }

    pub fn action(&self) -> MergeAction {
        match self.resolution {
            Resolution::Skip => MergeAction::Skip,
            Resolution::Overwrite => MergeAction::Overwrite,
            Resolution::MergeFields { .. } => MergeAction::MergeFields,
        }
    }

    /// Per-field choices; `Some` only for [`MergeAction::MergeFields`].
    pub fn field_choices(&self) -> Option<&BTreeMap<String, FieldChoice>> {
        match &self.resolution {
            Resolution::MergeFields { field_choices } => Some(field_choices),
            _ => None,
        }
    }

    /// Re-check this decision against a candidate, which may come from a
    /// different summary than the one it was built from.
    pub fn check_against(&self, candidate: &DuplicateCandidate) -> Result<(), CoreError> {
        if candidate.source_row_index != self.source_row_index
            || candidate.matched_contact_id != Some(self.matched_contact_id)
        {
            return Err(CoreError::Validation(format!(
                "Merge decision for row {} does not match the duplicate it claims to resolve",
                self.source_row_index
            )));
        }
        if let Some(choices) = self.field_choices() {
            let missing = missing_choices(candidate, choices);
            if !missing.is_empty() {
                return Err(CoreError::IncompleteMerge {
                    row: self.source_row_index,
                    missing,
                });
            }
        }
        Ok(())
    }
}

/// Conflicting fields of `candidate` that `choices` leaves unanswered.
fn missing_choices(candidate: &DuplicateCandidate, choices: &BTreeMap<String, FieldChoice>) -> Vec<String> {
    candidate
        .conflicting_fields
        .keys()
        .filter(|field| !choices.contains_key(*field))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// MergeDraft
// ---------------------------------------------------------------------------

/// The operator's in-progress answer for one duplicate row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeDraft {
    pub action: Option<MergeAction>,
    pub field_choices: BTreeMap<String, FieldChoice>,
}

impl MergeDraft {
    pub fn with_action(action: MergeAction) -> Self {
        Self {
            action: Some(action),
            field_choices: BTreeMap::new(),
        }
    }

    /// Turn the draft into a decision, or explain what is still missing.
    pub fn build(&self, candidate: &DuplicateCandidate) -> Result<MergeDecision, CoreError> {
        match self.action {
            None => Err(CoreError::Validation(format!(
                "Choose how to handle duplicate row {}",
                candidate.source_row_index
            ))),
            Some(MergeAction::Skip) => MergeDecision::skip(candidate),
            Some(MergeAction::Overwrite) => MergeDecision::overwrite(candidate),
            Some(MergeAction::MergeFields) => {
                MergeDecision::merge_fields(candidate, self.field_choices.clone())
            }
        }
    }

    pub fn is_complete(&self, candidate: &DuplicateCandidate) -> bool {
        self.build(candidate).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Whole-summary helpers
// ---------------------------------------------------------------------------

/// One `Skip` decision per duplicate row, in summary order.
///
/// Produces exactly what resolving every duplicate as Skip one by one
/// would.
pub fn skip_all_duplicates(summary: &ValidationSummary) -> Vec<MergeDecision> {
    summary
        .duplicates()
        .filter_map(|candidate| MergeDecision::skip(candidate).ok())
        .collect()
}

/// Check that `decisions` resolve every duplicate of `summary` exactly
/// once and return them in summary order.
pub fn validate_decisions(
    summary: &ValidationSummary,
    decisions: Vec<MergeDecision>,
) -> Result<Vec<MergeDecision>, CoreError> {
    let mut by_row: BTreeMap<RowIndex, MergeDecision> = BTreeMap::new();
    for decision in decisions {
        let row = decision.source_row_index;
        let candidate = summary.candidate(row).ok_or_else(|| {
            CoreError::Validation(format!("Merge decision refers to unknown row {row}"))
        })?;
        decision.check_against(candidate)?;
        if by_row.insert(row, decision).is_some() {
            return Err(CoreError::Validation(format!(
                "Row {row} has more than one merge decision"
            )));
        }
    }

    let mut ordered = Vec::with_capacity(by_row.len());
    let mut unresolved = BTreeSet::new();
    for candidate in summary.duplicates() {
        match by_row.remove(&candidate.source_row_index) {
            Some(decision) => ordered.push(decision),
            None => {
                unresolved.insert(candidate.source_row_index);
            }
        }
    }
    if let Some(row) = unresolved.first() {
        return Err(CoreError::Validation(format!(
            "Duplicate row {row} has no merge decision ({} unresolved in total)",
            unresolved.len()
        )));
    }
    Ok(ordered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
