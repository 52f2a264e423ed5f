//! Three-stage credential chain: signing key → signed JWT → IAM token.
//!
//! Each stage lives in its own JSON file and carries its own expiry, so a
//! valid later stage is used without touching the earlier ones. Validation
//! runs top-down:
//!
//! 1. exchanged token still valid → return it;
//! 2. signed assertion still valid → exchange it, persist, return;
//! 3. signing key present → mint a fresh assertion, persist, exchange.
//!
//! A failing stage stops the chain with a stage-specific error.

use crate::error::{CredentialError, Result};
use crate::store::JsonStore;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tokio::sync::Mutex;

/// Default IAM token exchange endpoint.
pub const DEFAULT_EXCHANGE_ENDPOINT: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

/// Lifetime of a freshly minted assertion (1 hour).
pub const ASSERTION_TTL_SECS: i64 = 3600;

/// Settings for the chained exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedSettings {
    /// Long-lived service account key (JSON with `id`, `service_account_id`,
    /// `private_key`).
    pub signing_key: PathBuf,
    /// Where the signed assertion is persisted.
    pub assertion: PathBuf,
    /// Where the exchanged token is persisted.
    pub token: PathBuf,
    /// Issuer override; defaults to the key's `service_account_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,
    /// Token exchange endpoint, also the assertion audience.
    #[serde(default = "default_exchange_endpoint")]
    pub exchange_endpoint: String,
    /// Exchange request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Service account signing key.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningKey {
    /// Key id, sent as the JWT `kid`.
    pub id: String,
    /// Owning service account.
    pub service_account_id: String,
    /// PEM private key. Text before the PEM header is ignored.
    pub private_key: String,
}

/// Persisted signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Compact JWT.
    pub jwt: String,
    /// Expiry, unix seconds.
    pub expires_at: i64,
}

/// Persisted exchanged token, in the exchange endpoint's own shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangedToken {
    /// Bearer token.
    pub iam_token: String,
    /// Expiry as RFC 3339.
    pub expires_at: String,
}

impl ExchangedToken {
    fn valid_at(&self, now: DateTime<Utc>) -> bool {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|at| at.with_timezone(&Utc) > now)
            .unwrap_or(false)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    aud: &'a str,
    iss: &'a str,
    iat: i64,
    exp: i64,
}

/// Chained-exchange credential provider.
pub struct ChainedExchange {
    client: Client,
    settings: ChainedSettings,
    signing_key: JsonStore,
    assertion: JsonStore,
    token: JsonStore,
    lock: Mutex<()>,
}

impl ChainedExchange {
    /// Build the provider. Nothing is read until the first request.
    pub fn new(client: Client, settings: ChainedSettings) -> Self {
        Self {
            client,
            signing_key: JsonStore::new(&settings.signing_key),
            assertion: JsonStore::new(&settings.assertion),
            token: JsonStore::new(&settings.token),
            settings,
            lock: Mutex::new(()),
        }
    }

    /// Walk the chain and return a valid exchanged token.
    pub async fn credential(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        let now = Utc::now();

        if let Some(token) = self.valid_token(now) {
            tracing::debug!("using persisted iam token");
            return Ok(token.iam_token);
        }

        let assertion = match self.valid_assertion(now) {
            Some(assertion) => assertion,
            None => {
                if !self.signing_key.exists() {
                    return Err(CredentialError::SigningKey(format!(
                        "{} not found",
                        self.signing_key.path().display()
                    )));
                }
                self.mint_assertion(now)?
            }
        };

        let token = self.exchange(&assertion).await?;
        Ok(token.iam_token)
    }

    /// Sign a new assertion with the signing key and persist it.
    pub fn mint_assertion(&self, now: DateTime<Utc>) -> Result<Assertion> {
        let key: SigningKey = self
            .signing_key
            .load()
            .map_err(|e| CredentialError::SigningKey(e.to_string()))?;

        let iat = now.timestamp();
        let exp = iat + ASSERTION_TTL_SECS;
        let issuer = self
            .settings
            .service_account_id
            .as_deref()
            .unwrap_or(&key.service_account_id);
        let claims = Claims {
            aud: &self.settings.exchange_endpoint,
            iss: issuer,
            iat,
            exp,
        };

        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(key.id.clone());
        let encoding = EncodingKey::from_rsa_pem(pem_block(&key.private_key).as_bytes())
            .map_err(|e| CredentialError::Assertion(e.to_string()))?;
        let jwt = jsonwebtoken::encode(&header, &claims, &encoding).map_err(|e| {
            tracing::error!("jwt creation error: {e}");
            CredentialError::Assertion(e.to_string())
        })?;

        let assertion = Assertion {
            jwt,
            expires_at: exp,
        };
        self.assertion
            .save(&assertion)
            .map_err(|e| CredentialError::Assertion(e.to_string()))?;
        tracing::info!("minted signed assertion for key {}", key.id);
        Ok(assertion)
    }

    async fn exchange(&self, assertion: &Assertion) -> Result<ExchangedToken> {
        let response = self
            .client
            .post(&self.settings.exchange_endpoint)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .json(&serde_json::json!({ "jwt": assertion.jwt }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("iam exchange failed: {e}");
                CredentialError::Exchange(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("iam exchange returned {status}: {body}");
            return Err(CredentialError::Exchange(format!("{status}: {body}")));
        }

        let token: ExchangedToken = response
            .json()
            .await
            .map_err(|e| CredentialError::Exchange(format!("invalid exchange reply: {e}")))?;
        self.token
            .save(&token)
            .map_err(|e| CredentialError::Exchange(e.to_string()))?;
        tracing::info!("iam token exchanged, expires at {}", token.expires_at);
        Ok(token)
    }

    fn valid_token(&self, now: DateTime<Utc>) -> Option<ExchangedToken> {
        self.read::<ExchangedToken>(&self.token)
            .filter(|token| token.valid_at(now))
    }

    fn valid_assertion(&self, now: DateTime<Utc>) -> Option<Assertion> {
        self.read::<Assertion>(&self.assertion)
            .filter(|assertion| assertion.expires_at > now.timestamp())
    }

    /// Unreadable stages count as invalid and get regenerated.
    fn read<T: serde::de::DeserializeOwned>(&self, store: &JsonStore) -> Option<T> {
        match store.load_optional() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("ignoring unreadable credential stage: {e}");
                None
            }
        }
    }
}

/// Strip anything before the PEM header (service account keys often carry a
/// banner line).
fn pem_block(raw: &str) -> &str {
    raw.find("-----BEGIN").map(|at| &raw[at..]).unwrap_or(raw)
}

fn default_exchange_endpoint() -> String {
    DEFAULT_EXCHANGE_ENDPOINT.to_owned()
}

fn default_timeout() -> u64 {
    30
}
