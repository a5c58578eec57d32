//! The remote collaborator the import wizard depends on.

use async_trait::async_trait;

use crm_core::intake::UploadedFile;
use crm_core::result::ImportResult;
use crm_core::tags::Tag;
use crm_core::validation::DuplicateCandidate;

use crate::error::ApiError;
use crate::file::SpreadsheetFile;
use crate::wire::{CommitRequest, ValidateRequest};

/// Server-side parsing, duplicate detection and persistence, seen from
/// the client.
///
/// Implemented over HTTP by [`crate::http::HttpImportClient`]; tests
/// substitute an in-memory implementation.
#[async_trait]
pub trait ImportBackend: Send + Sync {
    /// Parse a spreadsheet and return its handle, columns and row sample.
    async fn upload(&self, file: &SpreadsheetFile) -> Result<UploadedFile, ApiError>;

    /// Download the sample import template.
    async fn sample_template(&self) -> Result<Vec<u8>, ApiError>;

    /// Validate the uploaded file under a column mapping.
    async fn validate(&self, request: &ValidateRequest) -> Result<Vec<DuplicateCandidate>, ApiError>;

    /// Run the import. Partial failures are reported inside the result.
    async fn commit(&self, request: &CommitRequest) -> Result<ImportResult, ApiError>;

    /// List the tags that currently exist.
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;
}
