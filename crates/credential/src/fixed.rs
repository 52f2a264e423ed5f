//! Fixed secret read from configuration or the environment.

use crate::error::{CredentialError, Result};
use serde::{Deserialize, Serialize};

/// Where a static secret comes from. `value` wins over `env`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticSettings {
    /// Inline secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Environment variable holding the secret, read on every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

/// Static credential provider.
#[derive(Debug, Clone)]
pub struct StaticKey {
    settings: StaticSettings,
}

impl StaticKey {
    /// Wrap the settings.
    pub fn new(settings: StaticSettings) -> Self {
        Self { settings }
    }

    /// Return the configured secret.
    pub fn credential(&self) -> Result<String> {
        if let Some(value) = self.settings.value.as_deref().filter(|v| !v.is_empty()) {
            return Ok(value.to_owned());
        }

        match self.settings.env.as_deref() {
            Some(var) => std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CredentialError::Unset(var.to_owned())),
            None => Err(CredentialError::Unset("value".to_owned())),
        }
    }
}
