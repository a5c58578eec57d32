//! The import wizard: a [`WizardController`] driven through an
//! [`ImportBackend`].
//!
//! Every remote call is raced against the session's [`CancellationToken`].
//! Cancelling the token (directly, or through [`ImportWizard::reset`]) makes
//! the in-flight call resolve as [`ImportError::Cancelled`] without touching
//! the session. A failed call never touches the session either, so the
//! operator can retry the same step.
//!
//! Validation can also be run by the host itself: take a
//! [`ValidationRequest`] from [`ImportWizard::begin_validation`], send its
//! body however it likes, and hand the outcome to
//! [`ImportWizard::apply_validation`]. Responses for requests that are no
//! longer current are dropped.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crm_client::wire::{CommitRequest, ValidateRequest};
use crm_client::{ApiError, ImportBackend, SpreadsheetFile};
use crm_core::error::CoreError;
use crm_core::intake::{exceeds_advertised_size, screen_file, MAX_ADVERTISED_FILE_SIZE_BYTES};
use crm_core::mapping::{suggest_mapping, FieldMapping};
use crm_core::merge::MergeDecision;
use crm_core::result::{ImportPreview, ImportSummary};
use crm_core::session::{
    ImportSession, ImportStep, StaleReason, StepPayload, ValidationOutcome, ValidationTicket,
    WizardController,
};
use crm_core::tags::{Tag, TagSelection};
use crm_core::types::DbId;
use crm_core::validation::{DuplicateCandidate, ValidationSummary};

use crate::error::ImportError;
use crate::events::{EventBus, ImportEvent, ImportEventKind, RemoteCall};
use crate::resolver::DuplicateResolver;

/// A validation request tied to the ticket its response must present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub ticket: ValidationTicket,
    pub body: ValidateRequest,
}

/// What the Select Tags step shows on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChoices {
    pub available: Vec<Tag>,
    /// The session's selection with deleted tags removed.
    pub selection: TagSelection,
    /// Ids that were selected but no longer exist.
    pub dropped: Vec<DbId>,
}

pub struct ImportWizard<B> {
    backend: Arc<B>,
    controller: WizardController,
    cancel: CancellationToken,
    events: Arc<EventBus>,
}

impl<B: ImportBackend> ImportWizard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_events(backend, Arc::new(EventBus::default()))
    }

    /// Create a wizard publishing to a shared bus.
    pub fn with_events(backend: Arc<B>, events: Arc<EventBus>) -> Self {
        let controller = WizardController::new();
        tracing::info!(session_id = %controller.session().id(), "Import session started");
        Self {
            backend,
            controller,
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn session(&self) -> &ImportSession {
        self.controller.session()
    }

    pub fn step(&self) -> ImportStep {
        self.controller.step()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Token that aborts the current session's remote calls when cancelled.
    /// Once cancelled, every further call fails with
    /// [`ImportError::Cancelled`] until [`reset`](Self::reset).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ── Upload ──────────────────────────────────────────────────────────

    /// Screen `file` locally, send it to the parser and record the result.
    ///
    /// Files with an unsupported extension or no content are rejected
    /// before any network call.
    pub async fn upload(&mut self, file: &SpreadsheetFile) -> Result<ImportStep, ImportError> {
        self.expect_step(ImportStep::Upload)?;
        screen_file(&file.file_name, file.size_bytes())?;
        if exceeds_advertised_size(file.size_bytes()) {
            tracing::warn!(
                file_name = %file.file_name,
                size_bytes = file.size_bytes(),
                limit_bytes = MAX_ADVERTISED_FILE_SIZE_BYTES,
                "File is larger than the advertised limit, uploading anyway",
            );
        }

        let uploaded = self
            .guarded(RemoteCall::Upload, ImportError::UploadFailed, self.backend.upload(file))
            .await?;
        self.advance(StepPayload::Upload(uploaded))
    }

    /// Download the sample import template. Available from any step.
    pub async fn sample_template(&self) -> Result<Vec<u8>, ImportError> {
        self.guarded(
            RemoteCall::Template,
            ImportError::TemplateUnavailable,
            self.backend.sample_template(),
        )
        .await
    }

    // ── Map Columns ─────────────────────────────────────────────────────

    /// The current mapping if one was saved, otherwise a guess from the
    /// column names.
    pub fn suggested_mapping(&self) -> FieldMapping {
        let session = self.controller.session();
        if session.field_mapping().is_empty() {
            suggest_mapping(session.source_columns())
        } else {
            session.field_mapping().clone()
        }
    }

    pub fn map_columns(&mut self, mapping: FieldMapping) -> Result<ImportStep, ImportError> {
        self.advance(StepPayload::MapColumns {
            field_mapping: mapping,
        })
    }

    // ── Select Tags ─────────────────────────────────────────────────────

    /// Load the existing tags and reconcile the current selection against
    /// them.
    pub async fn load_tags(&self) -> Result<TagChoices, ImportError> {
        self.expect_step(ImportStep::SelectTags)?;
        let available = self
            .guarded(RemoteCall::ListTags, ImportError::TagsUnavailable, self.backend.list_tags())
            .await?;
        let mut selection = self.controller.session().selected_tag_ids().clone();
        let dropped = selection.reconcile(&available);
        if !dropped.is_empty() {
            tracing::debug!(?dropped, "Dropped selected tags that no longer exist");
        }
        Ok(TagChoices {
            available,
            selection,
            dropped,
        })
    }

    pub fn select_tags(&mut self, selection: TagSelection) -> Result<ImportStep, ImportError> {
        self.advance(StepPayload::SelectTags {
            selected_tag_ids: selection,
        })
    }

    // ── Resolve Duplicates ──────────────────────────────────────────────

    /// Issue a ticket and build the validation request for the current
    /// file and mapping. Any earlier request stops being current.
    pub fn begin_validation(&mut self) -> Result<ValidationRequest, ImportError> {
        let ticket = self.controller.issue_validation_ticket()?;
        let body = ValidateRequest {
            file_handle: ticket.file_handle.clone(),
            field_mapping: self.controller.session().field_mapping().clone(),
        };
        Ok(ValidationRequest { ticket, body })
    }

    /// Offer the outcome of a validation request.
    ///
    /// A stale ticket is discarded, whatever the outcome, and reported as
    /// [`ValidationOutcome::Discarded`]. A current ticket with a failed
    /// outcome leaves the session unchanged.
    pub fn apply_validation(
        &mut self,
        ticket: &ValidationTicket,
        outcome: Result<Vec<DuplicateCandidate>, ApiError>,
    ) -> Result<ValidationOutcome, ImportError> {
        if let Some(reason) = self.controller.staleness(ticket) {
            self.discarded(ticket, reason);
            return Ok(ValidationOutcome::Discarded(reason));
        }
        match outcome {
            Ok(rows) => Ok(self.accept_rows(ticket, rows)),
            Err(e) => Err(self.remote_failed(RemoteCall::Validate, &e, ImportError::ValidationFailed)),
        }
    }

    /// Make sure the session holds a summary for the current mapping,
    /// validating only if it does not.
    pub async fn ensure_validation(&mut self) -> Result<&ValidationSummary, ImportError> {
        self.expect_step(ImportStep::ResolveDuplicates)?;
        if !self.has_current_summary() {
            let request = self.begin_validation()?;
            let rows = self
                .guarded(
                    RemoteCall::Validate,
                    ImportError::ValidationFailed,
                    self.backend.validate(&request.body),
                )
                .await?;
            if let ValidationOutcome::Discarded(_) = self.accept_rows(&request.ticket, rows) {
                return Err(ImportError::Cancelled);
            }
        }
        self.controller
            .session()
            .validation_summary()
            .ok_or_else(|| CoreError::Validation("Validation summary is missing".to_string()).into())
    }

    /// Working state for the resolver, resumed from any decisions already
    /// recorded.
    pub fn resolver(&self) -> Result<DuplicateResolver, ImportError> {
        let session = self.controller.session();
        let summary = session.validation_summary().ok_or_else(not_validated)?;
        Ok(DuplicateResolver::with_decisions(
            summary.clone(),
            session.merge_decisions(),
        ))
    }

    pub fn resolve_duplicates(
        &mut self,
        decisions: Vec<MergeDecision>,
    ) -> Result<ImportStep, ImportError> {
        self.expect_step(ImportStep::ResolveDuplicates)?;
        let summary = self
            .controller
            .session()
            .validation_summary()
            .cloned()
            .ok_or_else(not_validated)?;
        self.advance(StepPayload::ResolveDuplicates {
            validation_summary: summary,
            merge_decisions: decisions,
        })
    }

    /// Finish the resolver's work and record it.
    pub fn resolve_with(&mut self, resolver: &DuplicateResolver) -> Result<ImportStep, ImportError> {
        let decisions = resolver.finish()?;
        self.resolve_duplicates(decisions)
    }

    // ── Preview / commit ────────────────────────────────────────────────

    pub fn preview(&self) -> Option<ImportPreview> {
        self.controller.session().preview()
    }

    /// Submit the import. On success the wizard moves to Complete; on any
    /// failure the session stays on Preview, intact, and the commit may be
    /// retried.
    pub async fn commit(&mut self) -> Result<ImportSummary, ImportError> {
        self.expect_step(ImportStep::Preview)?;
        let session = self.controller.session();
        let request = CommitRequest {
            file_handle: session
                .file_handle()
                .cloned()
                .ok_or_else(|| CoreError::Validation("No file has been uploaded".to_string()))?,
            field_mapping: session.field_mapping().clone(),
            tag_ids: session.selected_tag_ids().clone(),
            merge_decisions: session.merge_decisions().to_vec(),
        };
        let total_rows = session.validation_summary().map_or(0, |s| s.rows.len());

        let result = self
            .guarded(RemoteCall::Commit, ImportError::CommitFailed, self.backend.commit(&request))
            .await?;
        if !result.is_consistent_with(total_rows) {
            tracing::warn!(
                total_rows,
                imported = result.imported,
                updated = result.updated,
                skipped = result.skipped,
                "Import result counts exceed the number of submitted rows",
            );
        }

        let summary = ImportSummary::from(&result);
        self.advance(StepPayload::Preview {
            import_result: result,
        })?;
        tracing::info!(
            session_id = %self.controller.session().id(),
            imported = summary.imported,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Contact import completed",
        );
        self.publish(ImportEventKind::ImportCompleted {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    // ── Navigation ──────────────────────────────────────────────────────

    pub fn go_back(&mut self, to: ImportStep) -> Result<(), ImportError> {
        let from = self.controller.step();
        self.controller.go_back(to)?;
        self.step_changed(from, to);
        Ok(())
    }

    /// Abandon the session: cancel in-flight calls and start over at Upload.
    pub fn reset(&mut self) {
        let previous = self.controller.session().id();
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.controller.reset();

        let new_session_id = self.controller.session().id();
        tracing::info!(session_id = %previous, %new_session_id, "Import session reset");
        self.events.publish(ImportEvent::new(
            previous,
            ImportEventKind::SessionReset { new_session_id },
        ));
    }

    // ---- private helpers ----

    fn expect_step(&self, step: ImportStep) -> Result<(), CoreError> {
        let current = self.controller.step();
        if current != step {
            return Err(CoreError::WrongStep {
                current: current.as_str(),
                requested: step.as_str(),
            });
        }
        Ok(())
    }

    fn advance(&mut self, payload: StepPayload) -> Result<ImportStep, ImportError> {
        let from = self.controller.step();
        let to = self.controller.complete_step(payload)?;
        self.step_changed(from, to);
        Ok(to)
    }

    fn has_current_summary(&self) -> bool {
        let session = self.controller.session();
        session
            .validation_summary()
            .is_some_and(|s| s.mapping_fingerprint == session.field_mapping().fingerprint())
    }

    fn accept_rows(&mut self, ticket: &ValidationTicket, rows: Vec<DuplicateCandidate>) -> ValidationOutcome {
        let row_count = rows.len();
        let outcome = self.controller.accept_validation(ticket, rows);
        match outcome {
            ValidationOutcome::Accepted => {
                let duplicates = self
                    .controller
                    .session()
                    .validation_summary()
                    .map_or(0, |s| s.duplicate_count());
                tracing::info!(
                    session_id = %ticket.session_id,
                    rows = row_count,
                    duplicates,
                    "Validation summary accepted",
                );
            }
            ValidationOutcome::Discarded(reason) => self.discarded(ticket, reason),
        }
        outcome
    }

    fn discarded(&self, ticket: &ValidationTicket, reason: StaleReason) {
        tracing::debug!(
            session_id = %ticket.session_id,
            generation = ticket.generation,
            ?reason,
            "Discarded stale validation response",
        );
        self.publish(ImportEventKind::StaleValidationDiscarded { reason });
    }

    /// Run a remote call unless the session is cancelled first.
    async fn guarded<T, F>(
        &self,
        call: RemoteCall,
        fail: fn(String) -> ImportError,
        request: F,
    ) -> Result<T, ImportError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        self.publish(ImportEventKind::RequestStarted { call });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(call = call.as_str(), "Remote call cancelled");
                self.publish(ImportEventKind::RequestCancelled { call });
                Err(ImportError::Cancelled)
            }
            result = request => result.map_err(|e| self.remote_failed(call, &e, fail)),
        }
    }

    fn remote_failed(&self, call: RemoteCall, error: &ApiError, fail: fn(String) -> ImportError) -> ImportError {
        let message = error.user_message();
        tracing::warn!(
            session_id = %self.controller.session().id(),
            call = call.as_str(),
            status = ?error.status(),
            error = %error,
            "Remote call failed",
        );
        self.publish(ImportEventKind::RequestFailed {
            call,
            message: message.clone(),
        });
        fail(message)
    }

    fn step_changed(&self, from: ImportStep, to: ImportStep) {
        tracing::info!(
            session_id = %self.controller.session().id(),
            from = from.as_str(),
            to = to.as_str(),
            "Import step changed",
        );
        self.publish(ImportEventKind::StepChanged { from, to });
    }

    fn publish(&self, kind: ImportEventKind) {
        self.events
            .publish(ImportEvent::new(self.controller.session().id(), kind));
    }
}

fn not_validated() -> ImportError {
    CoreError::Validation("Duplicates must be validated before they can be resolved".to_string()).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
