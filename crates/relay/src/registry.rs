//! Live connection sets and per-channel message buffers.
//!
//! One mutex covers the whole registry. Delivery is a non-blocking hand-off
//! to each connection's writer task, so no operation awaits while holding
//! the lock. A channel with no live connection accumulates a bounded,
//! time-limited backlog that is flushed in order on the next connect.

use crate::envelope::Envelope;
use compact_str::CompactString;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

/// Registry-assigned identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

/// Buffer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Maximum buffered envelopes per channel; the oldest is dropped first.
    pub max_len: usize,
    /// Buffered envelopes older than this are discarded on the next flush.
    pub ttl: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_len: 50,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Snapshot of one channel's backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    /// Buffered envelope count.
    pub len: usize,
    /// Age of the oldest buffered envelope.
    pub oldest: Option<Duration>,
    /// Age of the newest buffered envelope.
    pub newest: Option<Duration>,
}

struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Envelope>,
}

struct Buffered {
    envelope: Envelope,
    enqueued_at: Instant,
}

#[derive(Default)]
struct Inner {
    live: BTreeMap<CompactString, Vec<Connection>>,
    buffers: BTreeMap<CompactString, VecDeque<Buffered>>,
}

/// Tracks live duplex connections keyed by channel and buffers envelopes for
/// channels with nobody listening.
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
    config: BufferConfig,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new(config: BufferConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Buffer bounds in effect.
    pub fn config(&self) -> BufferConfig {
        self.config
    }

    /// Register a connection and flush the channel's backlog to it.
    pub fn connect(&self, channel: &str, tx: mpsc::UnboundedSender<Envelope>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock();
        let connections = inner.live.entry(CompactString::new(channel)).or_default();
        connections.push(Connection { id, tx });
        tracing::debug!(
            "connection {} joined {channel}, {} live",
            id.0,
            connections.len()
        );

        let flushed = inner.flush(channel, self.config.ttl);
        if flushed > 0 {
            tracing::debug!("flushed {flushed} buffered messages to {channel}");
        }
        id
    }

    /// Remove a connection. The channel entry goes away with its last
    /// connection; its backlog is kept.
    pub fn disconnect(&self, channel: &str, id: ConnectionId) {
        self.inner.lock().remove(channel, id);
    }

    /// Deliver `envelope` to every live connection of `channel`, buffering it
    /// when none accepts. Never blocks and never fails.
    pub fn send(&self, channel: &str, envelope: Envelope) {
        let mut inner = self.inner.lock();

        // An existing backlog goes first so per-channel order holds.
        if inner.buffers.contains_key(channel) {
            inner.flush(channel, self.config.ttl);
        }

        let delivered =
            !inner.buffers.contains_key(channel) && inner.deliver(channel, &envelope) > 0;
        if delivered {
            tracing::debug!("sent {:?} to {channel}", envelope.status);
            return;
        }

        if self.config.max_len == 0 {
            tracing::debug!("dropping message for {channel}, buffering disabled");
            return;
        }

        let buffer = inner.buffers.entry(CompactString::new(channel)).or_default();
        buffer.push_back(Buffered {
            envelope,
            enqueued_at: Instant::now(),
        });
        while buffer.len() > self.config.max_len {
            buffer.pop_front();
            tracing::debug!("buffer for {channel} full, dropped oldest message");
        }
        tracing::debug!("buffered message for {channel}, {} queued", buffer.len());
    }

    /// Return undelivered envelopes from a failed connection to the channel.
    ///
    /// The connection is removed first, which closes its queue, so `rx` is
    /// drained completely. `unsent` (envelopes the writer had already taken)
    /// and the drained queue go to the front of the backlog in order, and the
    /// backlog is flushed to any remaining connections. Those connections may
    /// see an envelope twice.
    pub fn requeue(
        &self,
        channel: &str,
        id: ConnectionId,
        unsent: Vec<Envelope>,
        rx: &mut mpsc::UnboundedReceiver<Envelope>,
    ) {
        let mut inner = self.inner.lock();
        inner.remove(channel, id);

        let mut pending = unsent;
        while let Ok(envelope) = rx.try_recv() {
            pending.push(envelope);
        }
        if pending.is_empty() {
            return;
        }
        if self.config.max_len == 0 {
            tracing::debug!(
                "dropping {} undelivered messages for {channel}, buffering disabled",
                pending.len()
            );
            return;
        }

        tracing::debug!(
            "requeued {} undelivered messages from connection {} on {channel}",
            pending.len(),
            id.0
        );
        let now = Instant::now();
        let buffer = inner.buffers.entry(CompactString::new(channel)).or_default();
        for envelope in pending.into_iter().rev() {
            buffer.push_front(Buffered {
                envelope,
                enqueued_at: now,
            });
        }
        while buffer.len() > self.config.max_len {
            buffer.pop_front();
            tracing::debug!("buffer for {channel} full, dropped oldest message");
        }

        if inner.live.contains_key(channel) {
            inner.flush(channel, self.config.ttl);
        }
    }

    /// Envelopes currently buffered for `channel`, oldest first. Expired
    /// entries are not reported.
    pub fn buffered(&self, channel: &str) -> Vec<Envelope> {
        let now = Instant::now();
        let inner = self.inner.lock();
        inner
            .buffers
            .get(channel)
            .map(|buffer| {
                buffer
                    .iter()
                    .filter(|b| now.duration_since(b.enqueued_at) <= self.config.ttl)
                    .map(|b| b.envelope.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Backlog size and age range for `channel`.
    pub fn buffer_stats(&self, channel: &str) -> BufferStats {
        let now = Instant::now();
        let inner = self.inner.lock();
        let Some(buffer) = inner.buffers.get(channel) else {
            return BufferStats::default();
        };
        BufferStats {
            len: buffer.len(),
            oldest: buffer.front().map(|b| now.duration_since(b.enqueued_at)),
            newest: buffer.back().map(|b| now.duration_since(b.enqueued_at)),
        }
    }

    /// Number of live connections on `channel`.
    pub fn connection_count(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .live
            .get(channel)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

impl Inner {
    fn remove(&mut self, channel: &str, id: ConnectionId) {
        let Some(connections) = self.live.get_mut(channel) else {
            return;
        };
        let before = connections.len();
        connections.retain(|c| c.id != id);
        if connections.len() < before {
            tracing::debug!("connection {} left {channel}", id.0);
        }
        if connections.is_empty() {
            self.live.remove(channel);
        }
    }

    /// Hand `envelope` to every live connection, pruning closed ones.
    /// Returns how many accepted it.
    fn deliver(&mut self, channel: &str, envelope: &Envelope) -> usize {
        let Some(connections) = self.live.get_mut(channel) else {
            return 0;
        };

        let before = connections.len();
        connections.retain(|c| c.tx.send(envelope.clone()).is_ok());
        let accepted = connections.len();
        if accepted < before {
            tracing::debug!("pruned {} closed connections on {channel}", before - accepted);
        }
        if connections.is_empty() {
            self.live.remove(channel);
        }
        accepted
    }

    /// Drop expired entries, then deliver the backlog in order until a
    /// message finds no taker. Returns how many were delivered.
    fn flush(&mut self, channel: &str, ttl: Duration) -> usize {
        let Some(mut buffer) = self.buffers.remove(channel) else {
            return 0;
        };

        let now = Instant::now();
        let before = buffer.len();
        buffer.retain(|b| now.duration_since(b.enqueued_at) <= ttl);
        if buffer.len() < before {
            tracing::debug!(
                "discarded {} expired messages for {channel}",
                before - buffer.len()
            );
        }

        let mut flushed = 0;
        while let Some(front) = buffer.front() {
            if self.deliver(channel, &front.envelope) == 0 {
                break;
            }
            buffer.pop_front();
            flushed += 1;
        }

        if !buffer.is_empty() {
            self.buffers.insert(CompactString::new(channel), buffer);
        }
        flushed
    }
}
