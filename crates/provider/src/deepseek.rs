//! DeepSeek through an OpenRouter-style chat completions API.

use crate::error::{ProviderError, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DeepSeek backend.
#[derive(Debug, Clone)]
pub struct DeepSeek {
    model: CompactString,
    temperature: f64,
}

/// A chat message in the OpenAI-compatible shape.
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    /// Author role.
    pub role: &'static str,
    /// Message text.
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

/// OpenAI-compatible completion reply, reduced to what is read.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

impl ChatReply {
    /// Text of the first choice.
    pub fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Decode("reply has no choices".to_owned()))
    }
}

impl DeepSeek {
    /// Create the backend.
    pub fn new(model: CompactString, temperature: f64) -> Self {
        Self { model, temperature }
    }

    /// Build the request body for `prompt`.
    pub fn request(&self, prompt: &str) -> Result<Value> {
        let request = Request {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
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
