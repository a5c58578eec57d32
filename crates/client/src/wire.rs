//! Request and response bodies exchanged with the import endpoints.

use serde::{Deserialize, Serialize};

use crm_core::mapping::FieldMapping;
use crm_core::merge::MergeDecision;
use crm_core::tags::TagSelection;
use crm_core::types::FileHandle;
use crm_core::validation::DuplicateCandidate;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Standard `{ "error": ..., "code": ... }` error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Body of `POST /imports/contacts/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub file_handle: FileHandle,
    pub field_mapping: FieldMapping,
}

/// Data of a successful validation response.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    pub rows: Vec<DuplicateCandidate>,
}

/// Body of `POST /imports/contacts/commit`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    pub file_handle: FileHandle,
    pub field_mapping: FieldMapping,
    pub tag_ids: TagSelection,
    pub merge_decisions: Vec<MergeDecision>,
}
