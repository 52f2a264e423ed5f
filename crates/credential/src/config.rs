//! Credential configuration as it appears in the gateway TOML.

use crate::{chained::ChainedSettings, fixed::StaticSettings, oauth::OAuthSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which credential provider a backend uses, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialConfig {
    /// First-fit rotating keys stored at `path`.
    RotatingKeys {
        /// Key table location.
        path: PathBuf,
    },
    /// OAuth token refreshed on demand.
    OauthRefresh(OAuthSettings),
    /// Signing key → JWT → IAM token chain.
    ChainedExchange(ChainedSettings),
    /// Fixed secret.
    Static(StaticSettings),
}

impl CredentialConfig {
    /// Short name of the provider kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RotatingKeys { .. } => "rotating_keys",
            Self::OauthRefresh(_) => "oauth_refresh",
            Self::ChainedExchange(_) => "chained_exchange",
            Self::Static(_) => "static",
        }
    }

    /// Resolve relative store paths against `base` (the config file's
    /// directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        match self {
            Self::RotatingKeys { path } => resolve(path),
            Self::OauthRefresh(settings) => resolve(&mut settings.store),
            Self::ChainedExchange(settings) => {
                resolve(&mut settings.signing_key);
                resolve(&mut settings.assertion);
                resolve(&mut settings.token);
            }
            Self::Static(_) => {}
        }
    }
}
