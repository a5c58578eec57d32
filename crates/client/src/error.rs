use std::time::Duration;

/// Message shown when the server gave no usable explanation.
pub const GENERIC_SERVER_MESSAGE: &str = "The server could not process the request. Please try again.";

/// Message shown when the server could not be reached at all.
pub const GENERIC_NETWORK_MESSAGE: &str =
    "Could not reach the server. Check your connection and try again.";

/// Errors from the import API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("Malformed response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {}", api_detail(.message, .body))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable code from the error body, if any.
        code: Option<String>,
        /// Human-readable message from the error body, if any.
        message: Option<String>,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server's own explanation, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for the operator: the server's explanation when
    /// available, a generic one otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message: Some(m), .. } => m.clone(),
            Self::Api { status: 413, .. } => "The file is too large to import.".to_string(),
            Self::Api { .. } | Self::Decode(_) => GENERIC_SERVER_MESSAGE.to_string(),
            Self::Timeout(_) => "The server took too long to respond. Please try again.".to_string(),
            Self::Request(_) => GENERIC_NETWORK_MESSAGE.to_string(),
        }
    }
}

fn api_detail<'a>(message: &'a Option<String>, body: &'a str) -> &'a str {
    message.as_deref().unwrap_or(body)
}

/// Errors loading [`crate::config::ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a positive whole number of seconds, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}
