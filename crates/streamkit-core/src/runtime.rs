//! Spawning blocks from templates and driving them from outside.
//!
//! [`spawn`] turns a template into a live worker: build the chassis, call
//! the factory, run `setup`, snapshot the sender sides into a
//! [`BlockHandle`], then start the worker task. The handle is the only way
//! the outside world touches a running block: everything crosses a routing
//! channel, nothing shares state.

use std::collections::HashMap;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::block::{BlockFault, Chassis, HandleParts};
use crate::errors::{BlockError, LibraryError, RouteError};
use crate::library::{self, BlockTemplate};
use crate::message::Message;
use crate::route::{Broadcast, MsgReceiver, MsgSender, QueryRequest};

/// Instantiation failure: unknown block type or a failed setup.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("setup failed for {block_type}: {source}")]
    Setup {
        block_type: String,
        source: BlockError,
    },
}

/// Instantiates `template` under the given instance name and starts its
/// worker. Must be called within a tokio runtime.
pub fn spawn(template: &BlockTemplate, name: impl Into<String>) -> Result<BlockHandle, SpawnError> {
    let name = name.into();
    let mut hub = Chassis::new(name, template.route_names);
    let mut block = (template.build)();
    block.setup(&mut hub).map_err(|source| SpawnError::Setup {
        block_type: template.block_type.to_string(),
        source,
    })?;
    let parts = hub.into_handle_parts();
    debug!(block = %parts.name, kind = template.block_type, "block started");
    let task = tokio::spawn(async move { block.run().await });
    Ok(BlockHandle::new(parts, task))
}

/// Looks `block_type` up in the installed process-wide library and spawns
/// it. The unknown-type error is returned to the caller, never swallowed.
pub fn spawn_type(block_type: &str, name: impl Into<String>) -> Result<BlockHandle, SpawnError> {
    let template = library::library().get(block_type)?;
    spawn(&template, name)
}

/// Owner-side handle for one running block instance.
pub struct BlockHandle {
    id: Uuid,
    name: String,
    kind: String,
    desc: String,
    inputs: HashMap<String, MsgSender>,
    queries: HashMap<String, mpsc::Sender<QueryRequest>>,
    quit: watch::Sender<bool>,
    broadcast: Broadcast,
    faults: Option<mpsc::UnboundedReceiver<BlockFault>>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for BlockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

impl BlockHandle {
    fn new(parts: HandleParts, task: JoinHandle<()>) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            kind: parts.meta.map(|m| m.kind).unwrap_or("").to_string(),
            desc: parts.meta.map(|m| m.desc).unwrap_or("").to_string(),
            inputs: parts.inputs,
            queries: parts.queries,
            quit: parts.quit,
            broadcast: parts.broadcast,
            faults: parts.faults,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block type tag declared in setup.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Sends a message to the named inbound route. Blocks when the route's
    /// channel is full, so backpressure reaches the caller.
    pub async fn send(&self, route: &str, msg: Message) -> Result<(), RouteError> {
        let tx = self
            .inputs
            .get(route)
            .ok_or_else(|| RouteError::unknown(route))?;
        tx.send(msg).await.map_err(|_| RouteError::closed(route))
    }

    /// Sends a configuration message on the conventional `rule` route.
    pub async fn send_rule(&self, msg: Message) -> Result<(), RouteError> {
        self.send("rule", msg).await
    }

    /// Runs a synchronous introspection round trip on the named query
    /// route: the reply channel travels inside the request.
    pub async fn query(&self, route: &str) -> Result<Message, RouteError> {
        let tx = self
            .queries
            .get(route)
            .ok_or_else(|| RouteError::unknown(route))?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(QueryRequest { reply: reply_tx })
            .await
            .map_err(|_| RouteError::closed(route))?;
        reply_rx.await.map_err(|_| RouteError::closed(route))
    }

    /// Subscribes a fresh receiver to this block's broadcast output.
    pub fn subscribe(&self) -> MsgReceiver {
        self.broadcast.subscribe()
    }

    /// Sender side of the named inbound route, for wiring topologies.
    pub fn input_sender(&self, route: &str) -> Result<MsgSender, RouteError> {
        self.inputs
            .get(route)
            .cloned()
            .ok_or_else(|| RouteError::unknown(route))
    }

    /// Takes the fault stream. Yields every recoverable error the block
    /// reports; `None` after the first call.
    pub fn take_faults(&mut self) -> Option<mpsc::UnboundedReceiver<BlockFault>> {
        self.faults.take()
    }

    /// Signals the quit route. One-shot and idempotent to detect; the
    /// worker stops without processing further queued data events.
    pub fn signal_quit(&self) {
        let _ = self.quit.send(true);
    }

    /// Signals quit and waits for the worker to finish.
    pub async fn stop(self) {
        self.signal_quit();
        let _ = self.task.await;
    }
}

/// Wires `from`'s broadcast output into `to`'s named inbound route. Call
/// before the pipeline carries traffic; topology is not mutated while the
/// blocks referencing it run.
pub fn connect(from: &BlockHandle, to: &BlockHandle, route: &str) -> Result<(), RouteError> {
    let tx = to.input_sender(route)?;
    from.broadcast.attach(tx);
    Ok(())
}

/// Signals quit to every handle, then waits for all workers to finish.
pub async fn stop_all(handles: Vec<BlockHandle>) {
    for handle in &handles {
        handle.signal_quit();
    }
    let _ = join_all(handles.into_iter().map(|handle| handle.task)).await;
}
