//! Routing channels: the conduits that connect blocks.
//!
//! Inbound routes are bounded mpsc channels of [`Message`]; a full channel
//! blocks the sender, so backpressure propagates upstream: there is no
//! buffering or drop policy at this layer. Query routes carry a
//! [`QueryRequest`] whose reply channel rides inside the request itself.
//! [`Broadcast`] fans one produced message out to every subscriber, one
//! blocking send per subscriber.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::message::Message;

/// Capacity of every bounded route channel.
pub const ROUTE_CAPACITY: usize = 64;

pub type MsgSender = mpsc::Sender<Message>;
pub type MsgReceiver = mpsc::Receiver<Message>;

/// Introspection request delivered on a query route. The block replies on
/// the embedded channel with its externally-visible configuration snapshot.
#[derive(Debug)]
pub struct QueryRequest {
    pub reply: oneshot::Sender<Message>,
}

/// Fan-out side of a block's `data-out` route.
///
/// Cloneable handle over the subscriber list. Subscribers attached while the
/// owning block runs are an external-builder concern; the runtime wires the
/// whole topology before any block starts (quiesce before rewire).
#[derive(Clone, Default)]
pub struct Broadcast {
    subscribers: Arc<Mutex<Vec<MsgSender>>>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an existing sender (typically another block's inbound route)
    /// as a subscriber.
    pub fn attach(&self, tx: MsgSender) {
        self.lock().push(tx);
    }

    /// Creates a fresh bounded channel, subscribes its sender, and returns
    /// the receiver.
    pub fn subscribe(&self) -> MsgReceiver {
        let (tx, rx) = mpsc::channel(ROUTE_CAPACITY);
        self.attach(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers one copy of `msg` to every current subscriber.
    ///
    /// Sends happen sequentially; a slow subscriber blocks the caller until
    /// that subscriber drains. Subscribers whose receiver is gone are pruned.
    pub async fn send(&self, msg: Message) {
        // snapshot so no lock is held across an await
        let targets: Vec<MsgSender> = self.lock().clone();
        let mut saw_dead = false;
        for tx in &targets {
            if tx.send(msg.clone()).await.is_err() {
                saw_dead = true;
            }
        }
        if saw_dead {
            self.lock().retain(|tx| !tx.is_closed());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MsgSender>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
