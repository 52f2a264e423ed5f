//! Progress/result/error envelope sent over duplex connections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage reported by a successful terminal envelope.
pub const STAGE_COMPLETED: &str = "completed";

/// Stage reported by a failed terminal envelope.
pub const STAGE_FAILED: &str = "failed";

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Intermediate progress.
    Processing,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Error,
}

/// One message on a duplex connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Lifecycle status.
    pub status: Status,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Percent complete, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Stage label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Result payload, carried by `completed` envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Envelope {
    /// A `processing` envelope.
    pub fn update(message: impl Into<String>, progress: u8, stage: impl Into<String>) -> Self {
        Self {
            status: Status::Processing,
            message: message.into(),
            progress: Some(progress.min(100)),
            stage: Some(stage.into()),
            result: None,
        }
    }

    /// A `completed` envelope carrying `result`.
    pub fn success(message: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            status: Status::Completed,
            message: message.into(),
            progress: None,
            stage: Some(STAGE_COMPLETED.to_owned()),
            result,
        }
    }

    /// An `error` envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            progress: None,
            stage: Some(STAGE_FAILED.to_owned()),
            result: None,
        }
    }

    /// Whether this envelope ends a request.
    pub fn is_terminal(&self) -> bool {
        self.status != Status::Processing
    }
}
