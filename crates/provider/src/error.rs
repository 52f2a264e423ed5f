//! Backend call errors.

use credential::CredentialError;

/// Why an ask failed. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider configuration is incomplete.
    #[error("provider misconfigured: {0}")]
    Config(String),
    /// No credential could be produced.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The backend answered with a non-200 status.
    #[error("Response ai: {status}, {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },
    /// The request never completed (connect failure, timeout).
    #[error("Connection to AI failed: {0}")]
    Transport(String),
    /// The reply did not have the expected shape.
    #[error("unexpected reply: {0}")]
    Decode(String),
    /// The request was cancelled before it finished.
    #[error("request cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProviderError>;
