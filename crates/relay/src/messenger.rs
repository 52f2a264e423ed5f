//! Per-request progress reporting over a channel.
//!
//! A [`ProgressMessenger`] is bound to one channel and one request. It turns
//! progress, success and failure into [`Envelope`]s, and optionally resolves
//! a pending result future when the request settles. Settlement happens at
//! most once: a second terminal envelope, outbound or inbound, is logged and
//! dropped. The settlement lock is held while forwarding, so a messenger
//! shared between tasks never emits an update after its terminal envelope.

use crate::{envelope::Status, registry::ConnectionRegistry, Envelope};
use compact_str::CompactString;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Final outcome delivered to the pending result future.
pub type Outcome = Result<Value, String>;

/// How an inbound envelope was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Non-terminal, keep listening.
    Continue,
    /// The request completed successfully.
    Completed,
    /// The request failed.
    Error,
    /// A terminal envelope arrived after the request had already settled.
    Ignored,
}

#[derive(Default)]
struct Settlement {
    settled: bool,
    pending: Option<oneshot::Sender<Outcome>>,
}

/// Progress façade over the connection registry for one channel.
pub struct ProgressMessenger {
    channel: CompactString,
    registry: Arc<ConnectionRegistry>,
    settlement: Mutex<Settlement>,
}

impl ProgressMessenger {
    /// Bind a messenger to `channel`.
    pub fn new(channel: impl Into<CompactString>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            channel: channel.into(),
            registry,
            settlement: Mutex::new(Settlement::default()),
        }
    }

    /// The channel this messenger reports to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether a terminal envelope has already been emitted.
    pub fn is_settled(&self) -> bool {
        self.settlement.lock().settled
    }

    /// Create the pending result future. It resolves once, with the result
    /// of the first terminal envelope. Calling this again replaces the
    /// previous receiver, which then observes a closed channel.
    pub fn pending_result(&self) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.settlement.lock().pending = Some(tx);
        rx
    }

    /// Emit a `processing` envelope. Dropped once the request has settled.
    pub fn send_update(&self, message: impl Into<String>, progress: u8, stage: impl Into<String>) {
        // Held across the send so no update can overtake a terminal envelope.
        let settlement = self.settlement.lock();
        if settlement.settled {
            tracing::warn!("update after completion on {}, dropped", self.channel);
            return;
        }
        self.registry
            .send(&self.channel, Envelope::update(message, progress, stage));
    }

    /// Emit the terminal `completed` envelope. Returns `false` if the request
    /// had already settled.
    pub fn send_success(&self, message: impl Into<String>, result: Option<Value>) -> bool {
        let outcome = result.clone().unwrap_or(Value::Null);
        self.settle(Ok(outcome), Envelope::success(message, result))
    }

    /// Emit the terminal `error` envelope. Returns `false` if the request had
    /// already settled.
    pub fn send_error(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.settle(Err(message.clone()), Envelope::error(message))
    }

    /// Classify an inbound upstream envelope and relay it.
    ///
    /// `processing` is forwarded as an update. `completed` settles the request
    /// only when it carries an object result; otherwise it is treated as
    /// progress. `error` settles the request as failed.
    pub fn handle_message(&self, envelope: Envelope) -> Disposition {
        match envelope.status {
            Status::Processing => {
                let progress = envelope.progress.unwrap_or(0);
                let stage = envelope.stage.unwrap_or_default();
                self.send_update(envelope.message, progress, stage);
                Disposition::Continue
            }
            Status::Completed => {
                let Some(result) = envelope.result.filter(Value::is_object) else {
                    tracing::debug!("completed without an object result on {}", self.channel);
                    return Disposition::Continue;
                };
                if self.send_success(envelope.message, Some(result)) {
                    Disposition::Completed
                } else {
                    Disposition::Ignored
                }
            }
            Status::Error => {
                let message = if envelope.message.is_empty() {
                    "upstream error".to_owned()
                } else {
                    envelope.message
                };
                if self.send_error(message) {
                    Disposition::Error
                } else {
                    Disposition::Ignored
                }
            }
        }
    }

    /// Mark the request settled, emit `terminal` and resolve the pending
    /// future. Returns `false` if it was already settled.
    fn settle(&self, outcome: Outcome, terminal: Envelope) -> bool {
        let mut settlement = self.settlement.lock();
        if settlement.settled {
            tracing::warn!("duplicate terminal message on {}, ignored", self.channel);
            return false;
        }
        settlement.settled = true;
        self.registry.send(&self.channel, terminal);
        if let Some(tx) = settlement.pending.take() {
            // The receiver may have been dropped; nothing to resolve then.
            let _ = tx.send(outcome);
        }
        true
    }
}
