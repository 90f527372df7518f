/// Session interface - the upstream message queue the engine talks to
///
/// The engine pulls outgoing pairs and pushes incoming pairs. Every call is
/// non-blocking; a full queue is reported as `QueueFull` and the engine
/// decides what to drop.
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::contracts::Message;

/// The session queue cannot take another message right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session queue is full")]
pub struct QueueFull;

/// Two-part message queue consumed by the engine
pub trait Session {
    /// Take the next outgoing segment, if any
    fn pull_message(&mut self) -> Option<Message>;

    /// Offer an incoming segment
    fn push_message(&mut self, msg: Message) -> Result<(), QueueFull>;

    /// Make everything pushed so far visible to consumers
    fn flush(&mut self);

    /// Discard a partially delivered incoming message
    fn reset_receive_state(&mut self);
}

#[derive(Debug, Default)]
struct Queues {
    outbound: VecDeque<Message>,
    pending: Vec<Message>,
    delivered: VecDeque<Message>,
    inbound_capacity: usize,
    push_attempts: u64,
    flushes: u64,
    resets: u64,
}

impl Queues {
    fn inbound_len(&self) -> usize {
        self.pending.len() + self.delivered.len()
    }
}

/// Bounded in-memory session
///
/// Clones share the same queues, so one clone can be attached to an engine
/// while another feeds outgoing pairs and drains delivered ones.
#[derive(Debug, Clone)]
pub struct QueueSession {
    inner: Arc<Mutex<Queues>>,
}

impl QueueSession {
    /// Create a session holding at most `inbound_capacity` incoming segments
    pub fn new(inbound_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Queues {
                inbound_capacity,
                ..Queues::default()
            })),
        }
    }

    /// Queue a group/body pair for sending
    pub fn send(&self, group: impl Into<Vec<u8>>, body: impl Into<Vec<u8>>) {
        let mut queues = self.inner.lock();
        queues.outbound.push_back(Message::group(group));
        queues.outbound.push_back(Message::new(body));
    }

    /// Take the next delivered group/body pair
    pub fn recv(&self) -> Option<(Message, Message)> {
        let mut queues = self.inner.lock();
        if queues.delivered.len() < 2 {
            return None;
        }
        let group = queues.delivered.pop_front()?;
        let body = queues.delivered.pop_front()?;
        Some((group, body))
    }

    /// Number of outgoing segments not yet pulled by the engine
    pub fn outbound_len(&self) -> usize {
        self.inner.lock().outbound.len()
    }

    /// Number of incoming segments visible to consumers
    pub fn delivered_len(&self) -> usize {
        self.inner.lock().delivered.len()
    }

    /// Number of pushed but not yet flushed segments
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn push_attempts(&self) -> u64 {
        self.inner.lock().push_attempts
    }

    pub fn flush_count(&self) -> u64 {
        self.inner.lock().flushes
    }

    pub fn reset_count(&self) -> u64 {
        self.inner.lock().resets
    }

    /// Change the inbound capacity, e.g. after a consumer drained the queue
    pub fn set_inbound_capacity(&self, capacity: usize) {
        self.inner.lock().inbound_capacity = capacity;
    }
}

impl Session for QueueSession {
    fn pull_message(&mut self) -> Option<Message> {
        self.inner.lock().outbound.pop_front()
    }

    fn push_message(&mut self, msg: Message) -> Result<(), QueueFull> {
        let mut queues = self.inner.lock();
        queues.push_attempts += 1;
        if queues.inbound_len() >= queues.inbound_capacity {
            return Err(QueueFull);
        }
        queues.pending.push(msg);
        Ok(())
    }

    fn flush(&mut self) {
        let mut queues = self.inner.lock();
        queues.flushes += 1;
        let pending = std::mem::take(&mut queues.pending);
        queues.delivered.extend(pending);
    }

    fn reset_receive_state(&mut self) {
        let mut queues = self.inner.lock();
        queues.resets += 1;
        queues.pending.clear();
    }
}
