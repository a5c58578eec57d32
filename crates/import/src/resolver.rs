//! Working state of the Resolve Duplicates step.
//!
//! The operator answers duplicate rows one at a time, in any order, and may
//! leave answers half finished. [`DuplicateResolver`] keeps those answers as
//! [`MergeDraft`]s and only produces [`MergeDecision`]s once every duplicate
//! row is fully resolved.

use std::collections::BTreeMap;

use crm_core::error::CoreError;
use crm_core::merge::{FieldChoice, MergeAction, MergeDecision, MergeDraft};
use crm_core::types::RowIndex;
use crm_core::validation::{DuplicateCandidate, Partition, ValidationSummary};

#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    summary: ValidationSummary,
    drafts: BTreeMap<RowIndex, MergeDraft>,
}

impl DuplicateResolver {
    pub fn new(summary: ValidationSummary) -> Self {
        Self {
            summary,
            drafts: BTreeMap::new(),
        }
    }

    /// Resume from decisions recorded earlier for the same summary, e.g.
    /// when the operator steps back into the resolver.
    pub fn with_decisions(summary: ValidationSummary, decisions: &[MergeDecision]) -> Self {
        let mut resolver = Self::new(summary);
        for decision in decisions {
            if resolver.summary.candidate(decision.source_row_index()).is_none() {
                continue;
            }
            resolver.drafts.insert(
                decision.source_row_index(),
                MergeDraft {
                    action: Some(decision.action()),
                    field_choices: decision.field_choices().cloned().unwrap_or_default(),
                },
            );
        }
        resolver
    }

    pub fn summary(&self) -> &ValidationSummary {
        &self.summary
    }

    /// Rows grouped into errors-only, duplicate and clean.
    pub fn partition(&self) -> Partition<'_> {
        self.summary.partition()
    }

    pub fn draft(&self, row: RowIndex) -> Option<&MergeDraft> {
        self.drafts.get(&row)
    }

    /// Choose how to handle duplicate `row`. Field choices made earlier are
    /// kept, so switching to MergeFields and back loses nothing.
    pub fn set_action(&mut self, row: RowIndex, action: MergeAction) -> Result<(), CoreError> {
        self.duplicate(row)?;
        self.drafts.entry(row).or_default().action = Some(action);
        Ok(())
    }

    /// Pick a side for one conflicting field of duplicate `row`.
    pub fn choose_field(
        &mut self,
        row: RowIndex,
        field: &str,
        choice: FieldChoice,
    ) -> Result<(), CoreError> {
        let candidate = self.duplicate(row)?;
        if !candidate.conflicting_fields.contains_key(field) {
            return Err(CoreError::Validation(format!(
                "Field '{field}' does not conflict on row {row}"
            )));
        }
        self.drafts
            .entry(row)
            .or_default()
            .field_choices
            .insert(field.to_string(), choice);
        Ok(())
    }

    /// Set Skip on every duplicate row, replacing whatever was chosen.
    pub fn skip_all(&mut self) {
        let rows: Vec<RowIndex> = self.summary.duplicates().map(|c| c.source_row_index).collect();
        for row in rows {
            self.drafts.insert(row, MergeDraft::with_action(MergeAction::Skip));
        }
    }

    /// Duplicate rows whose draft is missing or incomplete, in summary order.
    pub fn pending_rows(&self) -> Vec<RowIndex> {
        self.summary
            .duplicates()
            .filter(|c| {
                self.drafts
                    .get(&c.source_row_index)
                    .map_or(true, |draft| !draft.is_complete(c))
            })
            .map(|c| c.source_row_index)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_rows().is_empty()
    }

    /// Build one decision per duplicate row, in summary order. Fails on the
    /// first row that is not fully resolved.
    pub fn finish(&self) -> Result<Vec<MergeDecision>, CoreError> {
        let empty = MergeDraft::default();
        self.summary
            .duplicates()
            .map(|candidate| {
                self.drafts
                    .get(&candidate.source_row_index)
                    .unwrap_or(&empty)
                    .build(candidate)
            })
            .collect()
    }

    fn duplicate(&self, row: RowIndex) -> Result<&DuplicateCandidate, CoreError> {
        self.summary
            .candidate(row)
            .filter(|c| c.is_duplicate())
            .ok_or_else(|| CoreError::Validation(format!("Row {row} is not a duplicate")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{clean, duplicate, with_errors};
    use assert_matches::assert_matches;
    use crm_core::merge::skip_all_duplicates;

    fn summary() -> ValidationSummary {
        ValidationSummary::new(
            "fp",
            vec![
                clean(0),
                duplicate(1, 10, &["email", "phone"]),
                with_errors(2, &["malformed email"]),
                duplicate(3, 11, &["city"]),
            ],
        )
    }

    #[test]
    fn partition_keeps_summary_order() {
        let resolver = DuplicateResolver::new(summary());
        let p = resolver.partition();
        let rows: Vec<_> = p.duplicates.iter().map(|c| c.source_row_index).collect();
        assert_eq!(rows, vec![1, 3]);
        assert_eq!(p.errors_only.len(), 1);
        assert_eq!(p.clean.len(), 1);
    }

    #[test]
    fn merge_fields_is_pending_until_every_field_is_chosen() {
        let mut r = DuplicateResolver::new(summary());
        r.set_action(1, MergeAction::MergeFields).unwrap();
        r.choose_field(1, "email", FieldChoice::UseIncoming).unwrap();
        r.set_action(3, MergeAction::Overwrite).unwrap();
        assert_eq!(r.pending_rows(), vec![1]);
        assert_matches!(r.finish(), Err(CoreError::IncompleteMerge { row: 1, .. }));

        r.choose_field(1, "phone", FieldChoice::UseExisting).unwrap();
        assert!(r.is_complete());
        let decisions = r.finish().unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].field_choices().unwrap().len(), 2);
    }

    #[test]
    fn unanswered_row_blocks_finish() {
        let mut r = DuplicateResolver::new(summary());
        r.set_action(1, MergeAction::Skip).unwrap();
        assert_eq!(r.pending_rows(), vec![3]);
        assert_matches!(r.finish(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn actions_only_apply_to_duplicates() {
        let mut r = DuplicateResolver::new(summary());
        assert!(r.set_action(0, MergeAction::Skip).is_err());
        assert!(r.set_action(2, MergeAction::Skip).is_err());
        assert!(r.set_action(99, MergeAction::Skip).is_err());
        assert!(r.choose_field(3, "email", FieldChoice::UseIncoming).is_err());
    }

    #[test]
    fn skip_all_matches_individual_skips() {
        let mut bulk = DuplicateResolver::new(summary());
        bulk.set_action(1, MergeAction::Overwrite).unwrap();
        bulk.skip_all();

        let mut one_by_one = DuplicateResolver::new(summary());
        one_by_one.set_action(3, MergeAction::Skip).unwrap();
        one_by_one.set_action(1, MergeAction::Skip).unwrap();

        let bulk = bulk.finish().unwrap();
        assert_eq!(bulk, one_by_one.finish().unwrap());
        assert_eq!(bulk, skip_all_duplicates(&summary()));
    }

    #[test]
    fn switching_action_keeps_field_choices() {
        let mut r = DuplicateResolver::new(summary());
        r.choose_field(3, "city", FieldChoice::UseExisting).unwrap();
        r.set_action(3, MergeAction::Skip).unwrap();
        r.set_action(3, MergeAction::MergeFields).unwrap();
        assert_eq!(
            r.draft(3).unwrap().field_choices.get("city"),
            Some(&FieldChoice::UseExisting)
        );
    }

    #[test]
    fn resumes_from_recorded_decisions() {
        let s = summary();
        let decisions = vec![
            MergeDecision::overwrite(s.candidate(1).unwrap()).unwrap(),
            MergeDecision::skip(s.candidate(3).unwrap()).unwrap(),
        ];
        let r = DuplicateResolver::with_decisions(s, &decisions);
        assert!(r.is_complete());
        assert_eq!(r.finish().unwrap(), decisions);
    }
}
