//! A user-mode overlay filesystem engine.
//!
//! A descriptor maps virtual names below a scope root to backing files
//! anywhere on disk. Calls that would create new files inside virtual
//! folders are materialized in a private scratch directory instead, so the
//! application's own directory is never modified. The engine only makes
//! path decisions; all I/O is delegated to a [`RealFs`].

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod glob;
pub mod host;
pub mod memory;
pub mod node;
pub mod path;
pub mod proxy;
pub mod resolver;
pub mod search;
pub mod tree;
pub mod tree_format;

pub use config::{ConfigError, OverlayConfig};
pub use descriptor::{DescriptorError, ParseReport};
pub use engine::Overlay;
pub use error::{Error, Result};
pub use host::{
    AttributeData, Disposition, FileAttributes, FileTime, FindData, FindOptions, OpenRequest,
    RealFs,
};
pub use memory::{Call, MemoryFile, MemoryFs};
pub use node::{EntryType, NodeID};
pub use proxy::CwdProxy;
pub use search::SearchHandle;
pub use tree::{NodeSnapshot, Tree};

#[cfg(test)]
mod tests;
