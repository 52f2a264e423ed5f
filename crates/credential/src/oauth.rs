//! Short-lived OAuth access token with on-demand refresh.
//!
//! The current token is reused while it stays valid for longer than
//! [`REFRESH_MARGIN_MS`]. Otherwise a client-credentials style request is
//! made with a stored basic-auth key; a successful reply replaces the stored
//! token wholesale, a failed one leaves the store untouched.

use crate::{
    error::{CredentialError, Result},
    store::JsonStore,
    unix_millis,
};
use indexmap::IndexMap;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tokio::sync::Mutex;

/// Tokens closer than this to expiry are refreshed (180 seconds).
pub const REFRESH_MARGIN_MS: i64 = 180 * 1000;

/// OAuth refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Token endpoint URL.
    pub endpoint: String,
    /// Base64 basic-auth key sent as `Authorization: Basic <key>`.
    pub authorization_key: String,
    /// Requested scope.
    pub scope: String,
    /// Where the current token is persisted.
    pub store: PathBuf,
    /// Refresh request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Persisted token metadata. The store maps the token string to this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Request id used when the token was issued.
    #[serde(rename = "RqUID", default)]
    pub rq_uid: String,
    /// Expiry, unix milliseconds.
    pub expires_at: i64,
    /// Issue time, unix milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: Option<String>,
    expires_at: Option<i64>,
}

/// OAuth refresh credential provider.
pub struct OAuthRefresh {
    client: Client,
    settings: OAuthSettings,
    store: JsonStore,
    current: Mutex<IndexMap<String, TokenRecord>>,
}

impl OAuthRefresh {
    /// Build the provider, loading any previously persisted token.
    pub fn open(client: Client, settings: OAuthSettings) -> Result<Self> {
        let store = JsonStore::new(&settings.store);
        let current = store.load_optional()?.unwrap_or_default();
        Ok(Self {
            client,
            settings,
            store,
            current: Mutex::new(current),
        })
    }

    /// Return a token valid for at least the refresh margin, refreshing if
    /// needed.
    pub async fn credential(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        let horizon = unix_millis() + REFRESH_MARGIN_MS;
        if let Some((token, _)) = current.iter().find(|(_, r)| r.expires_at > horizon) {
            tracing::debug!("using cached access token");
            return Ok(token.clone());
        }

        tracing::info!("no valid access token, refreshing");
        let (token, record) = self.refresh().await?;
        let replacement = IndexMap::from([(token.clone(), record)]);
        self.store.save(&replacement)?;
        *current = replacement;
        Ok(token)
    }

    /// Currently held token and its metadata, if any.
    pub async fn current(&self) -> Option<(String, TokenRecord)> {
        let current = self.current.lock().await;
        current
            .first()
            .map(|(token, record)| (token.clone(), record.clone()))
    }

    async fn refresh(&self) -> Result<(String, TokenRecord)> {
        let rq_uid = uuid::Uuid::new_v4().to_string();
        tracing::info!("requesting access token, RqUID {rq_uid}");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", self.settings.authorization_key),
            )
            .header(header::ACCEPT, "application/json")
            .header("RqUID", &rq_uid)
            .form(&[("scope", self.settings.scope.as_str())])
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "timeout while requesting token".to_owned()
                } else {
                    e.to_string()
                };
                tracing::error!("token refresh failed: {reason}");
                CredentialError::Refresh(reason)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("token endpoint returned {status}: {body}");
            return Err(CredentialError::Refresh(format!("{status}: {body}")));
        }

        let reply: TokenReply = response
            .json()
            .await
            .map_err(|e| CredentialError::Refresh(format!("invalid token reply: {e}")))?;
        let (Some(token), Some(expires_at)) = (reply.access_token, reply.expires_at) else {
            tracing::error!("token reply is missing access_token or expires_at");
            return Err(CredentialError::Refresh(
                "missing access_token or expires_at".to_owned(),
            ));
        };

        tracing::info!("access token refreshed, expires at {expires_at}");
        Ok((
            token,
            TokenRecord {
                rq_uid,
                expires_at,
                created_at: unix_millis(),
            },
        ))
    }
}

fn default_timeout() -> u64 {
    30
}
