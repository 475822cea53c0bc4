//! Block template library: the registry of block constructors.
//!
//! Templates are registered under their block-type name and looked up at
//! instantiation time. The process-wide registry is installed once at
//! startup with [`install_library`] (construct, then publish) and is
//! read-only afterwards. Adding a new block type to a deployment means
//! adding one template to the list the builder registers; nothing else
//! changes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::block::Block;
use crate::errors::LibraryError;

/// Constructor producing a fresh, un-setup block instance.
pub type BlockFactory = fn() -> Box<dyn Block>;

/// Immutable descriptor used to instantiate a block type.
#[derive(Clone, Copy)]
pub struct BlockTemplate {
    /// Unique key in the library.
    pub block_type: &'static str,
    /// Named inbound data routes the block declares (pre-created on the
    /// chassis; `setup` may still claim further routes by name).
    pub route_names: &'static [&'static str],
    pub build: BlockFactory,
}

/// A collection of block templates keyed by block type.
#[derive(Default, Clone)]
pub struct Library {
    templates: HashMap<String, BlockTemplate>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the template, overwriting any previous entry for the same
    /// block type. Last registration wins.
    pub fn register(&mut self, template: BlockTemplate) {
        self.templates
            .insert(template.block_type.to_string(), template);
    }

    /// Looks up a template by block type.
    pub fn get(&self, block_type: &str) -> Result<BlockTemplate, LibraryError> {
        self.templates
            .get(block_type)
            .copied()
            .ok_or_else(|| LibraryError::UnknownBlockType(block_type.to_string()))
    }

    /// Registered block types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

static LIBRARY: Lazy<RwLock<Arc<Library>>> = Lazy::new(|| RwLock::new(Arc::new(Library::new())));

/// Installs `library` as the process-wide registry.
///
/// The library is fully constructed before the swap, so concurrent readers
/// never observe a partially built registry. Re-invocation fully replaces
/// the previous contents; expected to run once at startup, before any block
/// is instantiated.
pub fn install_library(library: Library) {
    let mut slot = LIBRARY.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Arc::new(library);
}

/// Returns the installed process-wide library. Empty until
/// [`install_library`] has run.
pub fn library() -> Arc<Library> {
    LIBRARY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, Chassis};
    use crate::errors::BlockError;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl Block for Noop {
        fn setup(&mut self, hub: &mut Chassis) -> Result<(), BlockError> {
            hub.describe("noop", "does nothing");
            Ok(())
        }

        async fn run(&mut self) {}
    }

    fn new_noop() -> Box<dyn Block> {
        Box::new(Noop)
    }

    const FIRST: BlockTemplate = BlockTemplate {
        block_type: "noop",
        route_names: &["a"],
        build: new_noop,
    };

    const SECOND: BlockTemplate = BlockTemplate {
        block_type: "noop",
        route_names: &["b"],
        build: new_noop,
    };

    #[test]
    fn last_registration_wins() {
        let mut library = Library::new();
        library.register(FIRST);
        library.register(SECOND);
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("noop").unwrap().route_names, ["b"]);
    }

    #[test]
    fn unknown_block_type_is_an_error() {
        let library = Library::new();
        assert!(matches!(
            library.get("nope"),
            Err(LibraryError::UnknownBlockType(name)) if name == "nope"
        ));
    }

    #[test]
    fn types_are_sorted() {
        let mut library = Library::new();
        library.register(BlockTemplate {
            block_type: "zeta",
            route_names: &[],
            build: new_noop,
        });
        library.register(BlockTemplate {
            block_type: "alpha",
            route_names: &[],
            build: new_noop,
        });
        assert_eq!(library.types(), vec!["alpha", "zeta"]);
    }
}
