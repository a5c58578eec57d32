//! HTTP implementation of [`ImportBackend`].
//!
//! Wraps the import endpoints (upload, template, validate, commit) and the
//! tag listing using [`reqwest`]. Every JSON response is expected inside the
//! `{ "data": ... }` envelope; failures carry `{ "error", "code" }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crm_core::intake::{screen_file_name, UploadedFile};
use crm_core::result::ImportResult;
use crm_core::tags::Tag;
use crm_core::validation::DuplicateCandidate;

use crate::backend::ImportBackend;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::file::SpreadsheetFile;
use crate::wire::{CommitRequest, DataResponse, ErrorBody, ValidateRequest, ValidateResponse};

pub const UPLOAD_PATH: &str = "/imports/contacts/upload";
pub const TEMPLATE_PATH: &str = "/imports/contacts/template";
pub const VALIDATE_PATH: &str = "/imports/contacts/validate";
pub const COMMIT_PATH: &str = "/imports/contacts/commit";
pub const TAGS_PATH: &str = "/tags";

/// Multipart field name the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";

/// HTTP client for the contact import API.
#[derive(Debug, Clone)]
pub struct HttpImportClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpImportClient {
    /// Create a client with its own connection pool.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful to
    /// share one connection pool with the rest of the application).
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    // ---- private helpers ----

    /// Send a request with a per-call timeout, turning reqwest's timeout
    /// error into [`ApiError::Timeout`].
    async fn send(
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Request(error)
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying the
    /// status, the parsed error body when there is one, and the raw text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        Err(ApiError::Api {
            status: status.as_u16(),
            code: parsed.as_ref().and_then(|b| b.code.clone()),
            message: parsed.map(|b| b.error).filter(|m| !m.trim().is_empty()),
            body,
        })
    }

    /// Parse a successful `{ "data": T }` response body. A body that does
    /// not deserialize is an [`ApiError::Decode`], not a transport failure.
    async fn parse_data<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let envelope = response.json::<DataResponse<T>>().await.map_err(|e| {
            if e.is_decode() {
                ApiError::Decode(e)
            } else {
                Self::classify(e, timeout)
            }
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ImportBackend for HttpImportClient {
    /// `POST /imports/contacts/upload` as `multipart/form-data`.
    async fn upload(&self, file: &SpreadsheetFile) -> Result<UploadedFile, ApiError> {
        let mime = screen_file_name(&file.file_name)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(mime)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        tracing::info!(
            file_name = %file.file_name,
            size_bytes = file.size_bytes(),
            "Uploading spreadsheet",
        );

        let timeout = self.config.upload_timeout;
        let response = Self::send(self.client.post(self.url(UPLOAD_PATH)).multipart(form), timeout).await?;
        let uploaded: UploadedFile = Self::parse_data(response, timeout).await?;

        tracing::info!(
            file_handle = %uploaded.file_handle,
            columns = uploaded.columns.len(),
            "Spreadsheet parsed",
        );
        Ok(uploaded)
    }

    /// `GET /imports/contacts/template`, returning the raw file bytes.
    async fn sample_template(&self) -> Result<Vec<u8>, ApiError> {
        let timeout = self.config.request_timeout;
        let response = Self::send(self.client.get(self.url(TEMPLATE_PATH)), timeout).await?;
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(|e| Self::classify(e, timeout))?;
        Ok(bytes.to_vec())
    }

    /// `POST /imports/contacts/validate`.
    async fn validate(&self, request: &ValidateRequest) -> Result<Vec<DuplicateCandidate>, ApiError> {
        tracing::debug!(
            file_handle = %request.file_handle,
            mapped_columns = request.field_mapping.len(),
            "Requesting import validation",
        );
        let timeout = self.config.request_timeout;
        let response = Self::send(self.client.post(self.url(VALIDATE_PATH)).json(request), timeout).await?;
        let validated: ValidateResponse = Self::parse_data(response, timeout).await?;
        Ok(validated.rows)
    }

    /// `POST /imports/contacts/commit`.
    async fn commit(&self, request: &CommitRequest) -> Result<ImportResult, ApiError> {
        tracing::info!(
            file_handle = %request.file_handle,
            tags = request.tag_ids.len(),
            merge_decisions = request.merge_decisions.len(),
            "Committing contact import",
        );
        let timeout = self.config.commit_timeout;
        let response = Self::send(self.client.post(self.url(COMMIT_PATH)).json(request), timeout).await?;
        Self::parse_data(response, timeout).await
    }

    /// `GET /tags`.
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let timeout = self.config.request_timeout;
        let response = Self::send(self.client.get(self.url(TAGS_PATH)), timeout).await?;
        Self::parse_data(response, timeout).await
    }
}
