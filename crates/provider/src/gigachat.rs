//! Sber GigaChat chat completions.

use crate::{
    config::GigaChatConfig,
    deepseek::{ChatMessage, ChatReply},
    error::{ProviderError, Result},
};
use compact_str::CompactString;
use serde::Serialize;
use serde_json::Value;

/// GigaChat backend.
#[derive(Debug, Clone)]
pub struct GigaChat {
    model: CompactString,
    temperature: f64,
    repetition_penalty: f64,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    repetition_penalty: f64,
    temperature: f64,
}

impl GigaChat {
    /// Create the backend.
    pub fn new(model: CompactString, temperature: f64, extras: &GigaChatConfig) -> Self {
        Self {
            model,
            temperature,
            repetition_penalty: extras.repetition_penalty.unwrap_or(1.0),
        }
    }

    /// Build the request body for `prompt`.
    pub fn request(&self, prompt: &str) -> Result<Value> {
        let request = Request {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            repetition_penalty: self.repetition_penalty,
            temperature: self.temperature,
        };
        serde_json::to_value(request).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Extract the assistant text from a reply.
    pub fn answer(reply: Value) -> Result<String> {
        let reply: ChatReply =
            serde_json::from_value(reply).map_err(|e| ProviderError::Decode(e.to_string()))?;
        reply.into_text()
    }
}
