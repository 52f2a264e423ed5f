//! Duplex delivery for promptgate: who is listening on which channel, what
//! to hold for channels nobody is listening on, and how a single request
//! reports progress to its channel.

pub use {
    envelope::{Envelope, Status},
    messenger::{Disposition, Outcome, ProgressMessenger},
    registry::{BufferConfig, BufferStats, ConnectionId, ConnectionRegistry},
};

mod envelope;
mod messenger;
mod registry;
