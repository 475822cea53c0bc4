//! Error types for the block runtime.
//!
//! The taxonomy mirrors how faults are handled: everything in [`BlockError`]
//! is recoverable inside a running block (the event is abandoned, the loop
//! continues), [`LibraryError`] is returned to whoever asked for an unknown
//! block type, and [`RouteError`] covers misuse of the routing substrate.

use serde::{Deserialize, Serialize};

/// Recoverable fault inside a block's event loop. Never terminates the loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum BlockError {
    /// Malformed configuration: the previous valid rule stays in force.
    #[error("rule error: {0}")]
    Rule(String),
    /// Expression evaluation failed or produced an unexpected type: the
    /// message is dropped.
    #[error("eval error: {0}")]
    Eval(String),
    /// An external call (network, DNS, body read) failed: the message is
    /// dropped, no retry at this layer.
    #[error("external call error: {0}")]
    External(String),
    /// Routing substrate misuse, surfaced during setup.
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl BlockError {
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval(message.into())
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::External(message.into())
    }
}

/// Misuse of a block's routes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RouteError {
    #[error("unknown route: {name}")]
    Unknown { name: String },
    /// Each receiver side may be claimed exactly once, during setup.
    #[error("route already claimed: {name}")]
    AlreadyClaimed { name: String },
    /// The block behind this route has stopped.
    #[error("route closed: {name}")]
    Closed { name: String },
}

impl RouteError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    pub fn already_claimed(name: impl Into<String>) -> Self {
        Self::AlreadyClaimed { name: name.into() }
    }

    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }
}

/// Raised at instantiation time; must reach the caller, never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum LibraryError {
    #[error("unknown block type: {0}")]
    UnknownBlockType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_error_converts_into_block_error() {
        let err: BlockError = RouteError::unknown("in").into();
        assert!(matches!(err, BlockError::Route(RouteError::Unknown { .. })));
        assert_eq!(err.to_string(), "unknown route: in");
    }

    #[test]
    fn block_error_round_trips_through_serde() {
        let err = BlockError::rule("missing field");
        let value = serde_json::to_value(&err).unwrap();
        let back: BlockError = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }
}
