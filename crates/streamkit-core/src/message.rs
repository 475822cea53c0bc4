//! Messages carried on routes.
//!
//! A message is an arbitrary structured value with no fixed schema, carried
//! as a JSON tree. Ownership transfers to the receiver on send; the sender keeps no
//! claim on it. Blocks that need typed views deserialize with `serde` at the
//! point of use (rules) or address into the tree with `streamkit-path`
//! expressions (data).

/// The unit of data carried on every route.
pub type Message = serde_json::Value;
