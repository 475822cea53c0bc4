//! # streamkit-core
//!
//! Block execution and routing contract for the streamkit dataflow runtime.
//!
//! A pipeline is a set of independent blocks wired together through named
//! routes. Each block runs as its own tokio task, driven by a single select
//! loop over four kinds of input: data, rule (configuration), query
//! (introspection) and quit. Blocks never share state; every interaction
//! crosses a routing channel, and backpressure propagates upstream because
//! routes are bounded and broadcast sends block on slow subscribers.
//!
//! Block types live in a [`Library`] of templates. Instantiation goes
//! through [`runtime::spawn`] (or [`runtime::spawn_type`] against the
//! process-wide library installed at startup), which returns a
//! [`runtime::BlockHandle`]: the only surface the outside world uses to
//! feed, reconfigure, introspect and stop a running block.

pub mod block;
pub mod errors;
pub mod library;
pub mod message;
pub mod observability;
pub mod route;
pub mod runtime;

pub use block::{Block, BlockFault, BlockMeta, Chassis, Reporter};
pub use errors::{BlockError, LibraryError, RouteError};
pub use library::{BlockFactory, BlockTemplate, Library, install_library, library};
pub use message::Message;
pub use observability::init_observability;
pub use route::{Broadcast, MsgReceiver, MsgSender, QueryRequest, ROUTE_CAPACITY};
pub use runtime::{BlockHandle, SpawnError, connect, spawn, spawn_type, stop_all};
