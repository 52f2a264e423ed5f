//! Service-key authentication for the HTTP ask routes.
//!
//! Callers present `Authorization: Bearer <service key>`. The
//! [`Authenticator`] trait is the seam; [`ServiceKeyAuthenticator`] is the
//! static lookup configured from `[auth]`.

use crate::config::AuthConfig;
use compact_str::CompactString;
use std::{collections::BTreeSet, future::Future};

/// Identity of an authenticated caller service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Masked key, or `anonymous` when authentication is disabled.
    pub identity: CompactString,
}

/// Authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("missing service key")]
    Missing,
    /// The presented token is not a known service key.
    #[error("invalid or unknown service key")]
    InvalidToken,
}

/// Verifies caller credentials.
pub trait Authenticator: Send + Sync {
    /// Verify `token` (empty when none was presented).
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AuthContext, AuthError>> + Send;
}

/// Authenticates callers against a static set of service keys. An empty
/// set accepts every caller.
pub struct ServiceKeyAuthenticator {
    keys: BTreeSet<CompactString>,
}

impl ServiceKeyAuthenticator {
    /// Create from an explicit key set.
    pub fn new(keys: impl IntoIterator<Item = impl Into<CompactString>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Create from [`AuthConfig`].
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.service_keys.iter().map(String::as_str))
    }

    /// Whether any key is required.
    pub fn enabled(&self) -> bool {
        !self.keys.is_empty()
    }
}

impl Authenticator for ServiceKeyAuthenticator {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AuthContext, AuthError>> + Send {
        let result = if !self.enabled() {
            Ok(AuthContext {
                identity: CompactString::const_new("anonymous"),
            })
        } else if token.is_empty() {
            Err(AuthError::Missing)
        } else if self.keys.contains(token) {
            Ok(AuthContext {
                identity: credential::mask(token).into(),
            })
        } else {
            Err(AuthError::InvalidToken)
        };
        std::future::ready(result)
    }
}
