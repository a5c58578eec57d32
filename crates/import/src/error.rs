use crm_core::error::CoreError;

/// Errors surfaced by [`crate::wizard::ImportWizard`].
///
/// Remote failures carry the operator-facing message already resolved
/// from the server response (see [`crm_client::ApiError::user_message`]).
/// None of them change the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Import failed: {0}")]
    CommitFailed(String),

    #[error("Could not load tags: {0}")]
    TagsUnavailable(String),

    #[error("Could not download the sample template: {0}")]
    TemplateUnavailable(String),

    #[error("The import session was cancelled")]
    Cancelled,
}

impl ImportError {
    /// `true` for transient remote failures the operator can simply retry.
    /// Local contract violations and cancellation are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UploadFailed(_)
                | Self::ValidationFailed(_)
                | Self::CommitFailed(_)
                | Self::TagsUnavailable(_)
                | Self::TemplateUnavailable(_)
        )
    }
}
