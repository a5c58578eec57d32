//! Import wizard steps, session record, and the controller that owns it.
//!
//! [`WizardController`] is the single writer of an [`ImportSession`]. Steps
//! hand their output to [`WizardController::complete_step`] and navigate
//! back with [`WizardController::go_back`]; the controller enforces the
//! step order and discards downstream results whose inputs changed.
//!
//! Validation responses arrive asynchronously. Each request is issued a
//! [`ValidationTicket`] and its response is accepted only while the ticket
//! is still the current one (same session, same file, same mapping, latest
//! generation). Superseded responses are dropped without error.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::intake::{validate_uploaded_file, PreviewRow, UploadedFile, MAX_PREVIEW_ROWS};
use crate::mapping::FieldMapping;
use crate::merge::{validate_decisions, MergeDecision};
use crate::result::{ImportPreview, ImportResult};
use crate::tags::TagSelection;
use crate::types::{FileHandle, Timestamp};
use crate::validation::{DuplicateCandidate, ValidationSummary};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The six positions of the import wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStep {
    Upload,
    MapColumns,
    SelectTags,
    ResolveDuplicates,
    Preview,
    Complete,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 6;

impl ImportStep {
    /// Convert a 1-based step number to an `ImportStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Upload),
            2 => Ok(Self::MapColumns),
            3 => Ok(Self::SelectTags),
            4 => Ok(Self::ResolveDuplicates),
            5 => Ok(Self::Preview),
            6 => Ok(Self::Complete),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between 1 and {TOTAL_STEPS}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::Upload => 1,
            Self::MapColumns => 2,
            Self::SelectTags => 3,
            Self::ResolveDuplicates => 4,
            Self::Preview => 5,
            Self::Complete => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::MapColumns => "map_columns",
            Self::SelectTags => "select_tags",
            Self::ResolveDuplicates => "resolve_duplicates",
            Self::Preview => "preview",
            Self::Complete => "complete",
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::MapColumns => "Map Columns",
            Self::SelectTags => "Select Tags",
            Self::ResolveDuplicates => "Resolve Duplicates",
            Self::Preview => "Preview",
            Self::Complete => "Complete",
        }
    }

    /// The step a successful completion advances to.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.to_number() + 1).ok()
    }
}

impl std::fmt::Display for ImportStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// In-memory record of one run of the import wizard.
///
/// Read-only outside this module; every change goes through
/// [`WizardController`].
#[derive(Debug, Clone)]
pub struct ImportSession {
    id: Uuid,
    started_at: Timestamp,
    step: ImportStep,
    file_handle: Option<FileHandle>,
    file_name: Option<String>,
    source_columns: Vec<String>,
    preview_rows: Vec<PreviewRow>,
    field_mapping: FieldMapping,
    selected_tag_ids: TagSelection,
    validation_summary: Option<ValidationSummary>,
    merge_decisions: Vec<MergeDecision>,
    import_result: Option<ImportResult>,
}

impl ImportSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            step: ImportStep::Upload,
            file_handle: None,
            file_name: None,
            source_columns: Vec::new(),
            preview_rows: Vec::new(),
            field_mapping: FieldMapping::new(),
            selected_tag_ids: TagSelection::new(),
            validation_summary: None,
            merge_decisions: Vec::new(),
            import_result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn step(&self) -> ImportStep {
        self.step
    }

    pub fn file_handle(&self) -> Option<&FileHandle> {
        self.file_handle.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    pub fn preview_rows(&self) -> &[PreviewRow] {
        &self.preview_rows
    }

    pub fn field_mapping(&self) -> &FieldMapping {
        &self.field_mapping
    }

    pub fn selected_tag_ids(&self) -> &TagSelection {
        &self.selected_tag_ids
    }

    pub fn validation_summary(&self) -> Option<&ValidationSummary> {
        self.validation_summary.as_ref()
    }

    pub fn merge_decisions(&self) -> &[MergeDecision] {
        &self.merge_decisions
    }

    pub fn import_result(&self) -> Option<&ImportResult> {
        self.import_result.as_ref()
    }

    /// Commit preview, available once duplicates have been resolved.
    pub fn preview(&self) -> Option<ImportPreview> {
        let summary = self.validation_summary.as_ref()?;
        if self.step < ImportStep::Preview {
            return None;
        }
        Some(ImportPreview::build(
            summary,
            &self.merge_decisions,
            self.selected_tag_ids.len(),
        ))
    }

    fn clear_validation(&mut self) {
        self.validation_summary = None;
        self.merge_decisions.clear();
    }
}

// ---------------------------------------------------------------------------
// Step payloads
// ---------------------------------------------------------------------------

/// Output of a finished step, handed to [`WizardController::complete_step`].
#[derive(Debug, Clone)]
pub enum StepPayload {
    Upload(UploadedFile),
    MapColumns {
        field_mapping: FieldMapping,
    },
    SelectTags {
        selected_tag_ids: TagSelection,
    },
    ResolveDuplicates {
        validation_summary: ValidationSummary,
        merge_decisions: Vec<MergeDecision>,
    },
    Preview {
        import_result: ImportResult,
    },
}

impl StepPayload {
    /// The step this payload completes.
    pub fn step(&self) -> ImportStep {
        match self {
            Self::Upload(_) => ImportStep::Upload,
            Self::MapColumns { .. } => ImportStep::MapColumns,
            Self::SelectTags { .. } => ImportStep::SelectTags,
            Self::ResolveDuplicates { .. } => ImportStep::ResolveDuplicates,
            Self::Preview { .. } => ImportStep::Preview,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation tickets
// ---------------------------------------------------------------------------

/// Identifies one validation request and the inputs it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub session_id: Uuid,
    pub generation: u64,
    pub file_handle: FileHandle,
    pub mapping_fingerprint: String,
}

/// Why a validation response was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// The session was reset after the request was issued.
    SessionReset,
    /// A newer validation request was issued, or the file or mapping it
    /// was issued for has since been replaced.
    Superseded,
    /// The mapping changed after the request was issued.
    MappingChanged,
    /// The wizard is no longer on the Resolve Duplicates step.
    StepLeft,
}

/// Result of offering a validation response to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Discarded(StaleReason),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the [`ImportSession`] and enforces step order and invalidation.
#[derive(Debug)]
pub struct WizardController {
    session: ImportSession,
    /// Generation of the most recently issued validation ticket. Bumped on
    /// every issue and whenever the file or mapping is replaced.
    validation_generation: u64,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self {
            session: ImportSession::new(),
            validation_generation: 0,
        }
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn step(&self) -> ImportStep {
        self.session.step
    }

    /// Record the output of the current step and advance.
    ///
    /// Rejected, leaving the session untouched, if `payload` belongs to a
    /// different step or is missing required data.
    pub fn complete_step(&mut self, payload: StepPayload) -> Result<ImportStep, CoreError> {
        let current = self.session.step;
        if payload.step() != current {
            return Err(CoreError::WrongStep {
                current: current.as_str(),
                requested: payload.step().as_str(),
            });
        }

        match payload {
            StepPayload::Upload(file) => self.apply_upload(file)?,
            StepPayload::MapColumns { field_mapping } => self.apply_mapping(field_mapping)?,
            StepPayload::SelectTags { selected_tag_ids } => {
                self.session.selected_tag_ids = selected_tag_ids;
            }
            StepPayload::ResolveDuplicates {
                validation_summary,
                merge_decisions,
            } => self.apply_resolution(validation_summary, merge_decisions)?,
            StepPayload::Preview { import_result } => {
                self.session.import_result = Some(import_result);
            }
        }

        // Payloads never complete the final step, so `next` always exists.
        if let Some(next) = current.next() {
            self.session.step = next;
        }
        Ok(self.session.step)
    }

    /// Re-enter an earlier step without discarding any state.
    pub fn go_back(&mut self, to: ImportStep) -> Result<(), CoreError> {
        let current = self.session.step;
        if current == ImportStep::Complete || to >= current {
            return Err(CoreError::InvalidTransition {
                from: current.as_str(),
                to: to.as_str(),
            });
        }
        self.session.step = to;
        Ok(())
    }

    /// Discard the session and start over at Upload.
    ///
    /// Outstanding validation tickets become stale because the session id
    /// changes.
    pub fn reset(&mut self) {
        self.session = ImportSession::new();
        self.validation_generation += 1;
    }

    /// Issue a ticket for a validation request against the current file and
    /// mapping. Any earlier ticket stops being current.
    pub fn issue_validation_ticket(&mut self) -> Result<ValidationTicket, CoreError> {
        if self.session.step != ImportStep::ResolveDuplicates {
            return Err(CoreError::WrongStep {
                current: self.session.step.as_str(),
                requested: ImportStep::ResolveDuplicates.as_str(),
            });
        }
        let file_handle = self.session.file_handle.clone().ok_or_else(|| {
            CoreError::Validation("No file has been uploaded".to_string())
        })?;
        if self.session.field_mapping.is_empty() {
            return Err(CoreError::Validation(
                "Columns must be mapped before validation".to_string(),
            ));
        }
        self.validation_generation += 1;
        Ok(ValidationTicket {
            session_id: self.session.id,
            generation: self.validation_generation,
            file_handle,
            mapping_fingerprint: self.session.field_mapping.fingerprint(),
        })
    }

    /// Why `ticket` is no longer current, or `None` if it is.
    pub fn staleness(&self, ticket: &ValidationTicket) -> Option<StaleReason> {
        if ticket.session_id != self.session.id {
            Some(StaleReason::SessionReset)
        } else if ticket.generation != self.validation_generation
            || self.session.file_handle.as_ref() != Some(&ticket.file_handle)
        {
            Some(StaleReason::Superseded)
        } else if ticket.mapping_fingerprint != self.session.field_mapping.fingerprint() {
            Some(StaleReason::MappingChanged)
        } else if self.session.step != ImportStep::ResolveDuplicates {
            Some(StaleReason::StepLeft)
        } else {
            None
        }
    }

    /// Offer the rows returned for `ticket`.
    ///
    /// A current ticket replaces any previous summary and clears merge
    /// decisions. A stale one leaves the session exactly as it was.
    pub fn accept_validation(
        &mut self,
        ticket: &ValidationTicket,
        rows: Vec<DuplicateCandidate>,
    ) -> ValidationOutcome {
        if let Some(reason) = self.staleness(ticket) {
            return ValidationOutcome::Discarded(reason);
        }
        self.session.validation_summary = Some(ValidationSummary::new(
            ticket.mapping_fingerprint.clone(),
            rows,
        ));
        self.session.merge_decisions.clear();
        ValidationOutcome::Accepted
    }

    // ---- private helpers ----

    fn apply_upload(&mut self, file: UploadedFile) -> Result<(), CoreError> {
        validate_uploaded_file(&file)?;
        let UploadedFile {
            file_handle,
            file_name,
            columns,
            mut preview_rows,
        } = file;
        preview_rows.truncate(MAX_PREVIEW_ROWS);

        self.session.file_handle = Some(file_handle);
        self.session.file_name = Some(file_name);
        self.session.source_columns = columns;
        self.session.preview_rows = preview_rows;
        self.session.field_mapping = FieldMapping::new();
        self.session.import_result = None;
        self.session.clear_validation();
        self.validation_generation += 1;
        Ok(())
    }

    fn apply_mapping(&mut self, mapping: FieldMapping) -> Result<(), CoreError> {
        mapping.validate_against(&self.session.source_columns)?;
        if mapping != self.session.field_mapping {
            if self.session.validation_summary.is_some() {
                self.session.clear_validation();
            }
            self.validation_generation += 1;
        }
        self.session.field_mapping = mapping;
        Ok(())
    }

    fn apply_resolution(
        &mut self,
        summary: ValidationSummary,
        decisions: Vec<MergeDecision>,
    ) -> Result<(), CoreError> {
        if summary.mapping_fingerprint != self.session.field_mapping.fingerprint() {
            return Err(CoreError::StaleValidation);
        }
        let ordered = validate_decisions(&summary, decisions)?;
        self.session.validation_summary = Some(summary);
        self.session.merge_decisions = ordered;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::CanonicalField;
    use crate::merge::{FieldChoice, MergeAction};
    use crate::validation::fixtures::{clean, duplicate};
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    fn upload(columns: &[&str]) -> StepPayload {
        StepPayload::Upload(UploadedFile {
            file_handle: FileHandle::new("fh-1"),
            file_name: "contacts.csv".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            preview_rows: (0..10).map(|i| serde_json::json!([i])).collect(),
        })
    }

    fn mapping(pairs: &[(&str, CanonicalField)]) -> StepPayload {
        StepPayload::MapColumns {
            field_mapping: FieldMapping::from_pairs(pairs.iter().copied()),
        }
    }

    fn tags(ids: &[i64]) -> StepPayload {
        StepPayload::SelectTags {
            selected_tag_ids: ids.iter().copied().collect(),
        }
    }

    /// Drive a controller to Resolve Duplicates with a validated summary of
    /// one clean row and one duplicate conflicting on `email`.
    fn at_resolve_with_summary() -> WizardController {
        let mut c = WizardController::new();
        c.complete_step(upload(&["Name", "Email", "Phone"])).unwrap();
        c.complete_step(mapping(&[
            ("Name", CanonicalField::FullName),
            ("Email", CanonicalField::Email),
            ("Phone", CanonicalField::Phone),
        ]))
        .unwrap();
        c.complete_step(tags(&[1])).unwrap();
        let ticket = c.issue_validation_ticket().unwrap();
        assert_eq!(
            c.accept_validation(&ticket, vec![clean(0), duplicate(1, 42, &["email"])]),
            ValidationOutcome::Accepted
        );
        c
    }

    fn resolve_payload(c: &WizardController, decisions: Vec<MergeDecision>) -> StepPayload {
        StepPayload::ResolveDuplicates {
            validation_summary: c.session().validation_summary().unwrap().clone(),
            merge_decisions: decisions,
        }
    }

    // -- ImportStep --

    #[test]
    fn step_numbers_roundtrip() {
        for n in 1..=TOTAL_STEPS {
            assert_eq!(ImportStep::from_number(n).unwrap().to_number(), n);
        }
        assert!(ImportStep::from_number(0).is_err());
        assert!(ImportStep::from_number(7).is_err());
    }

    #[test]
    fn next_walks_forward_and_stops() {
        assert_eq!(ImportStep::Upload.next(), Some(ImportStep::MapColumns));
        assert_eq!(ImportStep::Preview.next(), Some(ImportStep::Complete));
        assert_eq!(ImportStep::Complete.next(), None);
    }

    // -- complete_step --

    #[test]
    fn new_session_starts_at_upload() {
        let c = WizardController::new();
        assert_eq!(c.step(), ImportStep::Upload);
        assert!(c.session().file_handle().is_none());
    }

    #[test]
    fn upload_advances_and_trims_preview() {
        let mut c = WizardController::new();
        assert_eq!(c.complete_step(upload(&["Email"])).unwrap(), ImportStep::MapColumns);
        assert_eq!(c.session().file_handle().unwrap().as_str(), "fh-1");
        assert_eq!(c.session().preview_rows().len(), MAX_PREVIEW_ROWS);
    }

    #[test]
    fn payload_for_other_step_is_rejected() {
        let mut c = WizardController::new();
        assert_matches!(
            c.complete_step(tags(&[1])),
            Err(CoreError::WrongStep { current: "upload", requested: "select_tags" })
        );
        assert_eq!(c.step(), ImportStep::Upload);
    }

    #[test]
    fn wrong_step_message_names_requested_then_current() {
        let mut c = WizardController::new();
        let err = c.complete_step(tags(&[1])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Step 'select_tags' cannot be completed while the wizard is on step 'upload'"
        );
    }

    #[test]
    fn mapping_with_unknown_column_keeps_step() {
        let mut c = WizardController::new();
        c.complete_step(upload(&["Email"])).unwrap();
        assert!(c.complete_step(mapping(&[("Fax", CanonicalField::Phone)])).is_err());
        assert_eq!(c.step(), ImportStep::MapColumns);
        assert!(c.session().field_mapping().is_empty());
    }

    #[test]
    fn mapping_changed_after_validation_clears_summary() {
        let mut c = at_resolve_with_summary();
        let decision = MergeDecision::skip(&c.session().validation_summary().unwrap().rows[1]).unwrap();
        c.complete_step(resolve_payload(&c, vec![decision])).unwrap();
        assert_eq!(c.session().merge_decisions().len(), 1);

        c.go_back(ImportStep::MapColumns).unwrap();
        c.complete_step(mapping(&[("Email", CanonicalField::Email)])).unwrap();

        assert!(c.session().validation_summary().is_none());
        assert!(c.session().merge_decisions().is_empty());
        assert_eq!(c.step(), ImportStep::SelectTags);
    }

    #[test]
    fn resubmitting_same_mapping_keeps_summary() {
        let mut c = at_resolve_with_summary();
        let same = FieldMapping::from_pairs([
            ("Name", CanonicalField::FullName),
            ("Email", CanonicalField::Email),
            ("Phone", CanonicalField::Phone),
        ]);
        c.go_back(ImportStep::MapColumns).unwrap();
        c.complete_step(StepPayload::MapColumns { field_mapping: same }).unwrap();
        assert!(c.session().validation_summary().is_some());
    }

    #[test]
    fn changing_tags_keeps_summary_and_decisions() {
        let mut c = at_resolve_with_summary();
        let decision = MergeDecision::overwrite(&c.session().validation_summary().unwrap().rows[1]).unwrap();
        c.complete_step(resolve_payload(&c, vec![decision])).unwrap();

        c.go_back(ImportStep::SelectTags).unwrap();
        c.complete_step(tags(&[1, 2, 3])).unwrap();

        assert!(c.session().validation_summary().is_some());
        assert_eq!(c.session().merge_decisions().len(), 1);
        assert_eq!(c.session().selected_tag_ids().len(), 3);
    }

    #[test]
    fn resolve_requires_decision_for_every_duplicate() {
        let mut c = at_resolve_with_summary();
        assert!(c.complete_step(resolve_payload(&c, vec![])).is_err());
        assert_eq!(c.step(), ImportStep::ResolveDuplicates);
    }

    #[test]
    fn resolve_with_merge_fields_covering_conflicts() {
        let mut c = at_resolve_with_summary();
        let candidate = c.session().validation_summary().unwrap().rows[1].clone();
        let choices = BTreeMap::from([("email".to_string(), FieldChoice::UseIncoming)]);
        let decision = MergeDecision::merge_fields(&candidate, choices).unwrap();
        assert_eq!(
            c.complete_step(resolve_payload(&c, vec![decision])).unwrap(),
            ImportStep::Preview
        );
        assert_eq!(c.session().merge_decisions()[0].action(), MergeAction::MergeFields);
        let preview = c.session().preview().unwrap();
        assert_eq!(preview.to_create, 1);
        assert_eq!(preview.to_update, 1);
    }

    #[test]
    fn resolve_rejects_summary_for_other_mapping() {
        let mut c = at_resolve_with_summary();
        let foreign = ValidationSummary::new("not-this-mapping", vec![clean(0)]);
        assert_matches!(
            c.complete_step(StepPayload::ResolveDuplicates {
                validation_summary: foreign,
                merge_decisions: vec![],
            }),
            Err(CoreError::StaleValidation)
        );
    }

    #[test]
    fn summary_without_duplicates_needs_no_decisions() {
        let mut c = WizardController::new();
        c.complete_step(upload(&["Email"])).unwrap();
        c.complete_step(mapping(&[("Email", CanonicalField::Email)])).unwrap();
        c.complete_step(tags(&[])).unwrap();
        let ticket = c.issue_validation_ticket().unwrap();
        c.accept_validation(&ticket, vec![clean(0), clean(1)]);
        let payload = resolve_payload(&c, vec![]);
        assert_eq!(c.complete_step(payload).unwrap(), ImportStep::Preview);
    }

    // -- go_back / terminal state --

    #[test]
    fn go_back_keeps_upstream_state() {
        let mut c = at_resolve_with_summary();
        c.go_back(ImportStep::SelectTags).unwrap();
        assert_eq!(c.session().file_handle().unwrap().as_str(), "fh-1");
        assert_eq!(c.session().field_mapping().len(), 3);
        assert!(c.session().selected_tag_ids().contains(1));
    }

    #[test]
    fn go_back_must_target_earlier_step() {
        let mut c = WizardController::new();
        c.complete_step(upload(&["Email"])).unwrap();
        assert!(c.go_back(ImportStep::MapColumns).is_err());
        assert!(c.go_back(ImportStep::Preview).is_err());
        assert!(c.go_back(ImportStep::Upload).is_ok());
    }

    #[test]
    fn complete_is_terminal() {
        let mut c = at_resolve_with_summary();
        let decision = MergeDecision::skip(&c.session().validation_summary().unwrap().rows[1]).unwrap();
        c.complete_step(resolve_payload(&c, vec![decision])).unwrap();
        c.complete_step(StepPayload::Preview {
            import_result: ImportResult {
                imported: 1,
                ..ImportResult::default()
            },
        })
        .unwrap();
        assert_eq!(c.step(), ImportStep::Complete);

        for step in [
            ImportStep::Upload,
            ImportStep::MapColumns,
            ImportStep::SelectTags,
            ImportStep::ResolveDuplicates,
            ImportStep::Preview,
        ] {
            assert_matches!(c.go_back(step), Err(CoreError::InvalidTransition { .. }));
        }
        assert_eq!(c.step(), ImportStep::Complete);

        c.reset();
        assert_eq!(c.step(), ImportStep::Upload);
        assert!(c.session().import_result().is_none());
    }

    #[test]
    fn new_upload_is_hard_reset_downstream() {
        let mut c = at_resolve_with_summary();
        c.go_back(ImportStep::Upload).unwrap();
        c.complete_step(upload(&["Email", "City"])).unwrap();
        assert!(c.session().field_mapping().is_empty());
        assert!(c.session().validation_summary().is_none());
        assert!(c.session().merge_decisions().is_empty());
        assert_eq!(c.session().source_columns().len(), 2);
    }

    // -- validation tickets --

    #[test]
    fn ticket_requires_resolve_step() {
        let mut c = WizardController::new();
        assert!(c.issue_validation_ticket().is_err());
    }

    #[test]
    fn older_ticket_is_discarded_after_remap() {
        let mut c = at_resolve_with_summary();
        c.go_back(ImportStep::MapColumns).unwrap();
        // Request A is issued by a stale view while the mapping is M1 ...
        c.complete_step(mapping(&[("Email", CanonicalField::Email)])).unwrap();
        c.complete_step(tags(&[1])).unwrap();
        let ticket_a = c.issue_validation_ticket().unwrap();

        // ... then the mapping changes to M2 and request B is issued.
        c.go_back(ImportStep::MapColumns).unwrap();
        c.complete_step(mapping(&[("Email", CanonicalField::Email), ("Phone", CanonicalField::Phone)]))
            .unwrap();
        c.complete_step(tags(&[1])).unwrap();
        let ticket_b = c.issue_validation_ticket().unwrap();

        assert_eq!(c.accept_validation(&ticket_b, vec![clean(7)]), ValidationOutcome::Accepted);
        assert_matches!(
            c.accept_validation(&ticket_a, vec![clean(9)]),
            ValidationOutcome::Discarded(_)
        );

        let summary = c.session().validation_summary().unwrap();
        assert_eq!(summary.mapping_fingerprint, c.session().field_mapping().fingerprint());
        assert_eq!(summary.rows[0].source_row_index, 7);
    }

    #[test]
    fn ticket_from_reset_session_is_discarded() {
        let mut c = at_resolve_with_summary();
        let ticket = c.issue_validation_ticket().unwrap();
        c.reset();
        assert_eq!(
            c.accept_validation(&ticket, vec![clean(0)]),
            ValidationOutcome::Discarded(StaleReason::SessionReset)
        );
        assert!(c.session().validation_summary().is_none());
    }

    #[test]
    fn ticket_is_discarded_after_leaving_step() {
        let mut c = at_resolve_with_summary();
        let ticket = c.issue_validation_ticket().unwrap();
        c.go_back(ImportStep::SelectTags).unwrap();
        assert_eq!(
            c.accept_validation(&ticket, vec![clean(0)]),
            ValidationOutcome::Discarded(StaleReason::StepLeft)
        );
    }

    #[test]
    fn accepting_replaces_previous_summary_entirely() {
        let mut c = at_resolve_with_summary();
        let ticket = c.issue_validation_ticket().unwrap();
        c.accept_validation(&ticket, vec![clean(3)]);
        let rows = &c.session().validation_summary().unwrap().rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_row_index, 3);
    }
}
