//! Provider implementation.
//!
//! `Provider` pairs one backend with its credential source and HTTP
//! transport. `build_provider()` matches on the configured backend kind.

use crate::{
    config::{BackendConfig, ProviderConfig},
    deepseek::DeepSeek,
    error::{ProviderError, Result},
    gigachat::GigaChat,
    http::HttpTransport,
    yandex::Yandex,
};
use compact_str::CompactString;
use credential::CredentialProvider;
use relay::ProgressMessenger;
use serde_json::{Value, json};
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Concrete backend, enum-dispatched.
#[derive(Debug, Clone)]
pub enum Backend {
    /// DeepSeek via OpenRouter.
    DeepSeek(DeepSeek),
    /// Sber GigaChat.
    GigaChat(GigaChat),
    /// Yandex Foundation Models.
    Yandex(Yandex),
}

impl Backend {
    fn request(&self, prompt: &str) -> Result<Value> {
        match self {
            Self::DeepSeek(b) => b.request(prompt),
            Self::GigaChat(b) => b.request(prompt),
            Self::Yandex(b) => b.request(prompt),
        }
    }

    fn answer(&self, reply: Value) -> Result<String> {
        match self {
            Self::DeepSeek(_) => DeepSeek::answer(reply),
            Self::GigaChat(_) => GigaChat::answer(reply),
            Self::Yandex(_) => Yandex::answer(reply),
        }
    }
}

/// A ready-to-use backend client.
pub struct Provider {
    name: CompactString,
    backend: Backend,
    http: HttpTransport,
    credential: CredentialProvider,
}

/// Construct a `Provider` from config and a shared HTTP client.
///
/// The credential provider is built here too, so each configured provider
/// owns exactly one writer for its credential store.
pub fn build_provider(config: &ProviderConfig, client: reqwest::Client) -> Result<Provider> {
    config.validate()?;
    let temperature = config.temperature.unwrap_or_default();
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut http = HttpTransport::new(client.clone(), &config.endpoint, timeout);

    let backend = match &config.backend {
        BackendConfig::DeepSeek(extras) => {
            http = http
                .with_header("HTTP-Referer", &extras.referer)?
                .with_header("X-Title", &extras.site_name)?;
            Backend::DeepSeek(DeepSeek::new(config.model.clone(), temperature))
        }
        BackendConfig::GigaChat(extras) => {
            Backend::GigaChat(GigaChat::new(config.model.clone(), temperature, extras))
        }
        BackendConfig::Yandex(extras) => {
            Backend::Yandex(Yandex::new(&config.model, temperature, extras))
        }
    };

    let credential = credential::build_credential(&config.credential, client)?;
    tracing::info!(
        "provider '{}' ready: {} with {} credentials",
        config.name,
        config.kind(),
        credential.kind()
    );
    Ok(Provider {
        name: config.name.clone(),
        backend,
        http,
        credential,
    })
}

impl Provider {
    /// Configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend this provider talks to.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Send `prompt` and return the assistant text.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let token = self.credential.credential().await?;
        let body = self.backend.request(prompt)?;
        let reply = self.http.send(&token, &body).await?;
        let text = self.backend.answer(reply)?;
        tracing::debug!("provider '{}' answered {} chars", self.name, text.len());
        Ok(text)
    }

    /// Send `prompt`, reporting progress and the outcome through
    /// `messenger`. Exactly one terminal envelope is emitted, including on
    /// cancellation.
    pub async fn ask_duplex(
        &self,
        prompt: &str,
        messenger: &ProgressMessenger,
        cancel: &CancellationToken,
    ) {
        match self.duplex(prompt, messenger, cancel).await {
            Ok(text) => {
                messenger.send_success(text.clone(), Some(json!({ "response": text })));
            }
            Err(e) => {
                tracing::error!("duplex ask on '{}' failed: {e}", self.name);
                messenger.send_error(e.to_string());
            }
        }
    }

    async fn duplex(
        &self,
        prompt: &str,
        messenger: &ProgressMessenger,
        cancel: &CancellationToken,
    ) -> Result<String> {
        messenger.send_update("Collecting messages", 10, "collecting_message");

        messenger.send_update("Collecting headers", 30, "collecting_headers");
        let token = cancellable(cancel, async {
            Ok(self.credential.credential().await?)
        })
        .await?;

        messenger.send_update("Collecting data", 40, "collecting_data");
        let body = self.backend.request(prompt)?;

        messenger.send_update("Sending request", 50, "sending_request");
        let reply = cancellable(cancel, self.http.send(&token, &body)).await?;
        self.backend.answer(reply)
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = fut => result,
    }
}
