use std::time::Duration;

use crate::error::ConfigError;

/// Default base URL of the CRM API for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

/// Import client configuration.
///
/// Uploads and commits process whole files on the server and get timeouts
/// in minutes; every other call uses the short request timeout.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are appended to.
    pub base_url: String,
    /// Timeout for validation, tag listing and template download.
    pub request_timeout: Duration,
    /// Timeout for the spreadsheet upload.
    pub upload_timeout: Duration,
    /// Timeout for the import commit.
    pub commit_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(600),
            commit_timeout: Duration::from_secs(600),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `CRM_API_URL`              | `http://localhost:3000/api/v1`   |
    /// | `CRM_REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `CRM_UPLOAD_TIMEOUT_SECS`  | `600`                            |
    /// | `CRM_COMMIT_TIMEOUT_SECS`  | `600`                            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = lookup("CRM_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.base_url);

        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(Duration::from_secs)
                    .ok_or(ConfigError::InvalidNumber { key, value: raw }),
            }
        };

        Ok(Self {
            base_url,
            request_timeout: secs("CRM_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            upload_timeout: secs("CRM_UPLOAD_TIMEOUT_SECS", defaults.upload_timeout)?,
            commit_timeout: secs("CRM_COMMIT_TIMEOUT_SECS", defaults.commit_timeout)?,
        })
    }
}
