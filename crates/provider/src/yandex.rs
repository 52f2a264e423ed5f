//! Yandex Foundation Models text completion (REST).

use crate::{
    config::YandexConfig,
    error::{ProviderError, Result},
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Yandex backend.
#[derive(Debug, Clone)]
pub struct Yandex {
    model_uri: String,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Reply {
    result: ReplyResult,
}

#[derive(Debug, Deserialize)]
struct ReplyResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    text: String,
}

impl Yandex {
    /// Create the backend. The model URI is `gpt://<folder>/<model>`.
    pub fn new(model: &CompactString, temperature: f64, extras: &YandexConfig) -> Self {
        Self {
            model_uri: format!("gpt://{}/{model}", extras.folder_id),
            temperature,
            max_tokens: extras.max_tokens,
        }
    }

    /// Fully qualified model URI.
    pub fn model_uri(&self) -> &str {
        &self.model_uri
    }

    /// Build the request body for `prompt`.
    pub fn request(&self, prompt: &str) -> Result<Value> {
        let request = Request {
            model_uri: &self.model_uri,
            completion_options: CompletionOptions {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            messages: [Message {
                role: "user",
                text: prompt,
            }],
        };
        serde_json::to_value(request).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Extract the first alternative's text from a reply.
    pub fn answer(reply: Value) -> Result<String> {
        let reply: Reply =
            serde_json::from_value(reply).map_err(|e| ProviderError::Decode(e.to_string()))?;
        reply
            .result
            .alternatives
            .into_iter()
            .next()
            .map(|alternative| alternative.message.text)
            .ok_or_else(|| ProviderError::Decode("reply has no alternatives".to_owned()))
    }
}
