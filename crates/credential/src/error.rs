//! Credential acquisition errors.
//!
//! "No credential available" is an ordinary outcome here, not a panic: every
//! provider reports it through [`CredentialError`] and the caller decides how
//! to surface it.

use std::path::PathBuf;

/// Why a credential could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Every rotating key is at its limit or still rate-limited.
    #[error("no usable key: all {0} keys are exhausted or rate-limited")]
    Exhausted(usize),
    /// The OAuth token endpoint did not hand out a new token.
    #[error("token refresh failed: {0}")]
    Refresh(String),
    /// The long-lived signing key is missing or unreadable.
    #[error("signing key unavailable: {0}")]
    SigningKey(String),
    /// Minting the signed assertion failed.
    #[error("error receiving jwt: {0}")]
    Assertion(String),
    /// Exchanging the assertion for an access token failed.
    #[error("error receiving iam token: {0}")]
    Exchange(String),
    /// A static secret was never configured.
    #[error("secret {0} is not set")]
    Unset(String),
    /// Reading or replacing a credential store failed.
    #[error("credential store {}: {source}", path.display())]
    Store {
        /// Store location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A credential store exists but does not hold the expected records.
    #[error("credential store {} is malformed: {source}", path.display())]
    Malformed {
        /// Store location.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CredentialError>;
