//! Provider configuration
//!
//! One `[[providers]]` entry per backend profile. The `provider` field
//! selects the backend and its extras appear at the same level in TOML;
//! credentials live in a nested `credential` table.

use crate::error::{ProviderError, Result};
use compact_str::CompactString;
use credential::CredentialConfig;
use serde::{Deserialize, Serialize};

/// Named provider configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Unique name, referenced from routing.
    pub name: CompactString,
    /// Model identifier sent to the backend.
    #[serde(default)]
    pub model: CompactString,
    /// Completion endpoint URL.
    #[serde(default)]
    pub endpoint: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Timeout for the backend call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Backend-specific settings, discriminated by the `provider` field.
    #[serde(flatten)]
    pub backend: BackendConfig,
    /// Where the bearer credential comes from.
    pub credential: CredentialConfig,
}

impl ProviderConfig {
    /// Provider kind string for logging.
    pub fn kind(&self) -> &'static str {
        match &self.backend {
            BackendConfig::DeepSeek(_) => "deep_seek",
            BackendConfig::GigaChat(_) => "giga_chat",
            BackendConfig::Yandex(_) => "yandex",
        }
    }

    /// Check that every field the backend needs is present.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            ProviderError::Config(format!("{field} is not set for provider '{}'", self.name))
        };

        if self.name.is_empty() {
            return Err(ProviderError::Config("provider name is empty".to_owned()));
        }
        if self.model.is_empty() {
            return Err(missing("model"));
        }
        if self.endpoint.is_empty() {
            return Err(missing("endpoint"));
        }
        if self.temperature.is_none() {
            return Err(missing("temperature"));
        }

        match &self.backend {
            BackendConfig::DeepSeek(c) => {
                if c.referer.is_empty() {
                    return Err(missing("referer"));
                }
                if c.site_name.is_empty() {
                    return Err(missing("site_name"));
                }
            }
            BackendConfig::GigaChat(c) => {
                if c.repetition_penalty.is_none() {
                    return Err(missing("repetition_penalty"));
                }
            }
            BackendConfig::Yandex(c) => {
                if c.folder_id.is_empty() {
                    return Err(missing("folder_id"));
                }
            }
        }
        Ok(())
    }
}

/// Backend-specific configuration, discriminated by the `provider` field.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum BackendConfig {
    /// DeepSeek through an OpenRouter-style gateway.
    DeepSeek(DeepSeekConfig),
    /// Sber GigaChat.
    GigaChat(GigaChatConfig),
    /// Yandex Foundation Models (REST).
    Yandex(YandexConfig),
}

/// DeepSeek extras.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DeepSeekConfig {
    /// Sent as `HTTP-Referer`.
    #[serde(default)]
    pub referer: String,
    /// Sent as `X-Title`.
    #[serde(default)]
    pub site_name: String,
}

/// GigaChat extras.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GigaChatConfig {
    /// Repetition penalty passed through to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
}

/// Yandex extras.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct YandexConfig {
    /// Cloud folder the model is billed to.
    #[serde(default)]
    pub folder_id: String,
    /// Completion length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    2000
}
