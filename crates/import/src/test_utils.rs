//! In-memory [`ImportBackend`] and row fixtures for the wizard tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crm_client::wire::{CommitRequest, ValidateRequest};
use crm_client::{ApiError, ImportBackend, SpreadsheetFile};
use crm_core::intake::UploadedFile;
use crm_core::result::ImportResult;
use crm_core::tags::Tag;
use crm_core::types::{DbId, FileHandle, RowIndex};
use crm_core::validation::{ConflictingValue, DuplicateCandidate};

use crate::events::RemoteCall;

// ---------------------------------------------------------------------------
// Row fixtures
// ---------------------------------------------------------------------------

pub fn clean(row: RowIndex) -> DuplicateCandidate {
    DuplicateCandidate {
        source_row_index: row,
        matched_contact_id: None,
        conflicting_fields: BTreeMap::new(),
        row_errors: vec![],
    }
}

pub fn with_errors(row: RowIndex, errors: &[&str]) -> DuplicateCandidate {
    DuplicateCandidate {
        row_errors: errors.iter().map(|e| e.to_string()).collect(),
        ..clean(row)
    }
}

pub fn duplicate(row: RowIndex, contact: DbId, fields: &[&str]) -> DuplicateCandidate {
    DuplicateCandidate {
        matched_contact_id: Some(contact),
        conflicting_fields: fields
            .iter()
            .map(|f| {
                (
                    f.to_string(),
                    ConflictingValue {
                        incoming: Some(format!("new-{f}")),
                        existing: Some(format!("old-{f}")),
                    },
                )
            })
            .collect(),
        ..clean(row)
    }
}

pub fn uploaded(handle: &str, columns: &[&str]) -> UploadedFile {
    UploadedFile {
        file_handle: FileHandle::new(handle),
        file_name: "contacts.csv".to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        preview_rows: vec![serde_json::json!(columns)],
    }
}

pub fn csv(name: &str) -> SpreadsheetFile {
    SpreadsheetFile::new(name, "Name,Email,Phone\nAda,ada@example.com,555\n".as_bytes())
}

// ---------------------------------------------------------------------------
// MockImportBackend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockState {
    uploaded: Option<UploadedFile>,
    validation_rows: Vec<DuplicateCandidate>,
    commit_result: ImportResult,
    tags: Vec<Tag>,
    /// Remaining scripted failures per call, as `(status, message)`.
    failures: HashMap<RemoteCall, Vec<(u16, Option<String>)>>,
    delays: HashMap<RemoteCall, Duration>,
    calls: Vec<RemoteCall>,
    validate_requests: Vec<ValidateRequest>,
    commit_requests: Vec<CommitRequest>,
}

/// Scripted stand-in for the import API.
///
/// Every call is recorded. Responses come from the configured values unless
/// a failure has been queued for that call.
#[derive(Clone, Default)]
pub struct MockImportBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockImportBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(self, file: UploadedFile) -> Self {
        self.state.lock().unwrap().uploaded = Some(file);
        self
    }

    pub fn with_validation_rows(self, rows: Vec<DuplicateCandidate>) -> Self {
        self.state.lock().unwrap().validation_rows = rows;
        self
    }

    pub fn with_commit_result(self, result: ImportResult) -> Self {
        self.state.lock().unwrap().commit_result = result;
        self
    }

    pub fn with_tags(self, tags: &[(DbId, &str)]) -> Self {
        self.state.lock().unwrap().tags = tags
            .iter()
            .map(|(id, name)| Tag {
                id: *id,
                name: name.to_string(),
            })
            .collect();
        self
    }

    /// Make the next `call` fail with `status` and an optional server
    /// message.
    pub fn fail_next(&self, call: RemoteCall, status: u16, message: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(call)
            .or_default()
            .push((status, message.map(str::to_string)));
    }

    /// Hold every `call` for `delay` before answering.
    pub fn delay(&self, call: RemoteCall, delay: Duration) {
        self.state.lock().unwrap().delays.insert(call, delay);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn validate_requests(&self) -> Vec<ValidateRequest> {
        self.state.lock().unwrap().validate_requests.clone()
    }

    pub fn commit_requests(&self) -> Vec<CommitRequest> {
        self.state.lock().unwrap().commit_requests.clone()
    }

    /// Record the call and pop a scripted failure for it, if any.
    async fn enter(&self, call: RemoteCall) -> Result<(), ApiError> {
        let (delay, failure) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            let failure = state.failures.get_mut(&call).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            });
            (state.delays.get(&call).copied(), failure)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some((status, message)) => Err(ApiError::Api {
                status,
                code: None,
                body: message.clone().unwrap_or_else(|| "<html>error</html>".to_string()),
                message,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ImportBackend for MockImportBackend {
    async fn upload(&self, file: &SpreadsheetFile) -> Result<UploadedFile, ApiError> {
        self.enter(RemoteCall::Upload).await?;
        let configured = self.state.lock().unwrap().uploaded.clone();
        Ok(configured.unwrap_or_else(|| UploadedFile {
            file_name: file.file_name.clone(),
            ..uploaded("fh-1", &["Name", "Email", "Phone"])
        }))
    }

    async fn sample_template(&self) -> Result<Vec<u8>, ApiError> {
        self.enter(RemoteCall::Template).await?;
        Ok(b"First Name,Last Name,Email\n".to_vec())
    }

    async fn validate(&self, request: &ValidateRequest) -> Result<Vec<DuplicateCandidate>, ApiError> {
        self.state.lock().unwrap().validate_requests.push(request.clone());
        self.enter(RemoteCall::Validate).await?;
        Ok(self.state.lock().unwrap().validation_rows.clone())
    }

    async fn commit(&self, request: &CommitRequest) -> Result<ImportResult, ApiError> {
        self.state.lock().unwrap().commit_requests.push(request.clone());
        self.enter(RemoteCall::Commit).await?;
        Ok(self.state.lock().unwrap().commit_result.clone())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.enter(RemoteCall::ListTags).await?;
        Ok(self.state.lock().unwrap().tags.clone())
    }
}
