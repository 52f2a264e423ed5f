//! Credential providers for promptgate backends.
//!
//! Each backend family needs a different kind of bearer secret: rotating API
//! keys with daily quotas, a short-lived OAuth token, or an IAM token derived
//! from a signed JWT. [`CredentialProvider`] dispatches over all of them
//! behind one `credential()` call; "nothing available" is an `Err`, never a
//! panic.

pub use {
    chained::{ChainedExchange, ChainedSettings},
    config::CredentialConfig,
    error::{CredentialError, Result},
    fixed::{StaticKey, StaticSettings},
    oauth::{OAuthRefresh, OAuthSettings},
    rotating::{KeyUsage, RotatingKeys},
    store::JsonStore,
};

pub mod chained;
mod config;
mod error;
mod fixed;
pub mod oauth;
pub mod rotating;
mod store;

use std::time::{SystemTime, UNIX_EPOCH};

/// A configured credential provider.
pub enum CredentialProvider {
    /// Rotating API keys.
    RotatingKeys(RotatingKeys),
    /// OAuth refresh token.
    OAuth(OAuthRefresh),
    /// Chained JWT → IAM exchange.
    Chained(ChainedExchange),
    /// Fixed secret.
    Static(StaticKey),
}

impl CredentialProvider {
    /// Produce a currently valid credential.
    pub async fn credential(&self) -> Result<String> {
        match self {
            Self::RotatingKeys(p) => p.credential(),
            Self::OAuth(p) => p.credential().await,
            Self::Chained(p) => p.credential().await,
            Self::Static(p) => p.credential(),
        }
    }

    /// Short name of the provider kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RotatingKeys(_) => "rotating_keys",
            Self::OAuth(_) => "oauth_refresh",
            Self::Chained(_) => "chained_exchange",
            Self::Static(_) => "static",
        }
    }
}

/// Construct a [`CredentialProvider`] from config and a shared HTTP client.
pub fn build_credential(
    config: &CredentialConfig,
    client: reqwest::Client,
) -> Result<CredentialProvider> {
    let provider = match config {
        CredentialConfig::RotatingKeys { path } => {
            CredentialProvider::RotatingKeys(RotatingKeys::open(path)?)
        }
        CredentialConfig::OauthRefresh(settings) => {
            CredentialProvider::OAuth(OAuthRefresh::open(client, settings.clone())?)
        }
        CredentialConfig::ChainedExchange(settings) => {
            CredentialProvider::Chained(ChainedExchange::new(client, settings.clone()))
        }
        CredentialConfig::Static(settings) => {
            CredentialProvider::Static(StaticKey::new(settings.clone()))
        }
    };
    tracing::debug!("built {} credential provider", provider.kind());
    Ok(provider)
}

/// Mask a secret for logging, keeping a short prefix.
pub fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}***")
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
