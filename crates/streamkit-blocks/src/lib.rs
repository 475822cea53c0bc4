//! Built-in blocks for streamkit and the library builder.
//!
//! Adding a new block type is a one-line change here: implement
//! [`streamkit_core::Block`], give the type a `TEMPLATE` const, and add it
//! to the list in [`build_library`]. No other component changes.

use std::sync::Arc;

use streamkit_core::{Library, install_library, library};

pub mod get_http;
pub mod ticker;
pub mod to_log;

pub use get_http::{GetHttp, GetHttpRule};
pub use ticker::Ticker;
pub use to_log::ToLog;

/// Builds the built-in block library and installs it process-wide.
///
/// Call once at startup, before any block is instantiated. Re-invocation
/// fully replaces the registry (the new library is constructed first, then
/// published, so readers never see a partial registry).
pub fn build_library() -> Arc<Library> {
    tracing::info!("building block library");
    let mut lib = Library::new();
    for template in [GetHttp::TEMPLATE, Ticker::TEMPLATE, ToLog::TEMPLATE] {
        lib.register(template);
    }
    install_library(lib);
    library()
}
