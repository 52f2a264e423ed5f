//! Prompt requests and their validation.
//!
//! Requests arrive as loosely typed JSON ([`AskPayload`]) and are turned
//! into an immutable [`PromptRequest`] before they reach the gateway core.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Why a request was rejected before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The caller id is not a UUID.
    #[error("Invalid user uid")]
    InvalidCaller,
    /// The prompt is empty or whitespace.
    #[error("prompt must not be empty")]
    EmptyPrompt,
    /// The purpose is not one of the known categories.
    #[error("Allowed purposes: {}", Purpose::ALL.map(Purpose::as_str).join(", "))]
    UnknownPurpose(String),
    /// The body is not valid JSON of the expected shape.
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// The caller's intent category, used to route to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Generate attributes from a description.
    AttributeGeneration,
    /// Match attributes against each other.
    AttributeMatcher,
    /// Check a single attribute.
    CheckingAttribute,
}

impl Purpose {
    /// Every purpose, in declaration order.
    pub const ALL: [Purpose; 3] = [
        Self::AttributeGeneration,
        Self::AttributeMatcher,
        Self::CheckingAttribute,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributeGeneration => "attribute_generation",
            Self::AttributeMatcher => "attribute_matcher",
            Self::CheckingAttribute => "checking_attribute",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive.
impl FromStr for Purpose {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| RequestError::UnknownPurpose(s.to_owned()))
    }
}

/// Raw ask body as posted by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskPayload {
    /// Caller UUID, as text.
    #[serde(alias = "user_uuid")]
    pub caller_id: String,
    /// Prompt text.
    pub prompt: String,
    /// Purpose name.
    pub purpose: String,
}

/// A validated, immutable prompt request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    caller_id: Uuid,
    prompt: String,
    purpose: Purpose,
}

impl PromptRequest {
    /// Validate and build a request.
    pub fn new(
        caller_id: Uuid,
        prompt: impl Into<String>,
        purpose: Purpose,
    ) -> Result<Self, RequestError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        Ok(Self {
            caller_id,
            prompt,
            purpose,
        })
    }

    /// Caller identity.
    pub fn caller_id(&self) -> Uuid {
        self.caller_id
    }

    /// Prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Routing purpose.
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }
}

impl TryFrom<AskPayload> for PromptRequest {
    type Error = RequestError;

    fn try_from(payload: AskPayload) -> Result<Self, Self::Error> {
        let caller_id =
            Uuid::parse_str(payload.caller_id.trim()).map_err(|_| RequestError::InvalidCaller)?;
        let purpose = payload.purpose.parse()?;
        Self::new(caller_id, payload.prompt, purpose)
    }
}
