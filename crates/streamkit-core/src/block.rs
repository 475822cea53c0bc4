//! The block contract and the chassis every block builds on.
//!
//! A block is an independent worker with four kinds of input: data, rule
//! (configuration), query (introspection) and quit. Concrete blocks compose
//! a [`Chassis`] (the routing substrate) instead of inheriting from a base
//! type: `setup` acquires every route the block will use for its lifetime,
//! `run` is a single `tokio::select!` loop over them.
//!
//! ## Lifecycle
//!
//! - [`Block::setup`] runs exactly once, before `run`, never again. It
//!   declares the block's kind and description and claims routes from the
//!   chassis. Routes are never created lazily inside `run`.
//! - [`Block::run`] is the block's entire lifetime and must not return until
//!   the quit route fires. One event per loop iteration; the quit arm is
//!   checked first (`biased`), so quit wins when several routes are ready at
//!   once and no further data is serviced after it.
//! - [`Reporter::report`] handles recoverable faults: the current event is
//!   abandoned, the loop keeps waiting. Only quit ends the loop.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{BlockError, RouteError};
use crate::route::{Broadcast, MsgReceiver, MsgSender, QueryRequest, ROUTE_CAPACITY};

/// Static identity a block declares in `setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// Type tag, e.g. `"gethttp"`.
    pub kind: &'static str,
    /// Human-readable description for introspection.
    pub desc: &'static str,
}

/// A recoverable fault reported by a running block. Observable from the
/// outside through [`BlockHandle::take_faults`](crate::runtime::BlockHandle::take_faults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockFault {
    /// Instance name.
    pub block: String,
    /// Block type tag.
    pub kind: String,
    pub error: BlockError,
}

/// Reporting half handed to a block during setup.
#[derive(Clone)]
pub struct Reporter {
    block: String,
    kind: String,
    tx: mpsc::UnboundedSender<BlockFault>,
}

impl Reporter {
    /// Reports a recoverable fault without terminating the block's loop.
    pub fn report(&self, error: BlockError) {
        warn!(block = %self.block, kind = %self.kind, %error, "block fault");
        let _ = self.tx.send(BlockFault {
            block: self.block.clone(),
            kind: self.kind.clone(),
            error,
        });
    }
}

struct InSlot {
    tx: MsgSender,
    rx: Option<MsgReceiver>,
}

impl InSlot {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(ROUTE_CAPACITY);
        Self { tx, rx: Some(rx) }
    }
}

struct QuerySlot {
    tx: mpsc::Sender<QueryRequest>,
    rx: Option<mpsc::Receiver<QueryRequest>>,
}

impl QuerySlot {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(ROUTE_CAPACITY);
        Self { tx, rx: Some(rx) }
    }
}

/// Per-instance routing substrate.
///
/// Created by the runtime when a template is instantiated; handed to the
/// block's `setup` for route acquisition, then consumed into a
/// [`BlockHandle`](crate::runtime::BlockHandle) holding the sender sides.
/// Each receiver may be claimed exactly once.
pub struct Chassis {
    id: Uuid,
    name: String,
    meta: Option<BlockMeta>,
    inputs: HashMap<String, InSlot>,
    queries: HashMap<String, QuerySlot>,
    quit_tx: watch::Sender<bool>,
    quit_rx: watch::Receiver<bool>,
    broadcast: Broadcast,
    fault_tx: mpsc::UnboundedSender<BlockFault>,
    fault_rx: Option<mpsc::UnboundedReceiver<BlockFault>>,
}

impl Chassis {
    /// Builds a chassis with the template's declared in-routes pre-created.
    /// Additional routes may still be claimed by name during setup.
    pub(crate) fn new(name: impl Into<String>, route_names: &[&str]) -> Self {
        let (quit_tx, quit_rx) = watch::channel(false);
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let inputs = route_names
            .iter()
            .map(|name| (name.to_string(), InSlot::new()))
            .collect();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            meta: None,
            inputs,
            queries: HashMap::new(),
            quit_tx,
            quit_rx,
            broadcast: Broadcast::new(),
            fault_tx,
            fault_rx: Some(fault_rx),
        }
    }

    /// Declares the block's kind and description. Call first in `setup`, so
    /// the [`Reporter`] and the handle carry the right tag.
    pub fn describe(&mut self, kind: &'static str, desc: &'static str) {
        self.meta = Some(BlockMeta { kind, desc });
    }

    /// Claims the receiver of the named inbound data route. By convention
    /// the rule route is the in-route named `"rule"`.
    pub fn in_route(&mut self, name: &str) -> Result<MsgReceiver, RouteError> {
        let slot = self
            .inputs
            .entry(name.to_string())
            .or_insert_with(InSlot::new);
        slot.rx
            .take()
            .ok_or_else(|| RouteError::already_claimed(name))
    }

    /// Claims the receiver of the named query route.
    pub fn query_route(&mut self, name: &str) -> Result<mpsc::Receiver<QueryRequest>, RouteError> {
        let slot = self
            .queries
            .entry(name.to_string())
            .or_insert_with(QuerySlot::new);
        slot.rx
            .take()
            .ok_or_else(|| RouteError::already_claimed(name))
    }

    /// Returns a watcher on this block's quit route. Once the flag flips (or
    /// the handle is dropped) the block must return promptly.
    pub fn quit(&self) -> watch::Receiver<bool> {
        self.quit_rx.clone()
    }

    /// Returns the block's broadcast output route.
    pub fn broadcast(&self) -> Broadcast {
        self.broadcast.clone()
    }

    /// Returns the fault reporter for this instance.
    pub fn reporter(&self) -> Reporter {
        Reporter {
            block: self.name.clone(),
            kind: self.meta.map(|m| m.kind).unwrap_or("").to_string(),
            tx: self.fault_tx.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> Option<BlockMeta> {
        self.meta
    }

    pub(crate) fn into_handle_parts(mut self) -> HandleParts {
        HandleParts {
            id: self.id,
            name: self.name,
            meta: self.meta,
            inputs: self
                .inputs
                .into_iter()
                .map(|(name, slot)| (name, slot.tx))
                .collect(),
            queries: self
                .queries
                .into_iter()
                .map(|(name, slot)| (name, slot.tx))
                .collect(),
            quit: self.quit_tx,
            broadcast: self.broadcast,
            faults: self.fault_rx.take(),
        }
    }
}

pub(crate) struct HandleParts {
    pub id: Uuid,
    pub name: String,
    pub meta: Option<BlockMeta>,
    pub inputs: HashMap<String, MsgSender>,
    pub queries: HashMap<String, mpsc::Sender<QueryRequest>>,
    pub quit: watch::Sender<bool>,
    pub broadcast: Broadcast,
    pub faults: Option<mpsc::UnboundedReceiver<BlockFault>>,
}

/// The contract every processing unit implements.
#[async_trait]
pub trait Block: Send {
    /// Called exactly once, before `run`. Declares kind/description and
    /// acquires every route the block will use for its lifetime.
    fn setup(&mut self, hub: &mut Chassis) -> Result<(), BlockError>;

    /// The block's entire lifetime: a single select loop over the acquired
    /// routes. Must not return until the quit route fires.
    async fn run(&mut self);
}
